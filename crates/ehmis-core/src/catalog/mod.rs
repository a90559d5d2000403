//! Static reference tables: UBOS district populations and indicator
//! metadata. Both are built once and only ever read.

pub mod indicators;
pub mod population;

pub use indicators::{
    Category, DropoutPair, IndicatorCatalog, IndicatorMeta, Polarity, RateDefinition, RateScale,
    WashIndicator, ANC1_CODE, ANC_CODE_PREFIX, DELIVERY_CODE_PREFIX, EPI_CODE_PREFIX,
    LIVE_BIRTHS_CODE, MALARIA_CASES_CODE, PNC_CODE_PREFIX, REPORTING_RATE_ID, REPORTING_RATE_NAME,
};
pub use population::{clean_district_name, PopulationRegistry, POPULATION_YEAR};
