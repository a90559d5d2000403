//! UBOS district population estimates.
//!
//! The district table is loaded once and never mutated. Facility catchment
//! overrides live on the registry instance, so each caller can supply its own
//! without touching the shared table.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Projection year of the UBOS estimates below.
pub const POPULATION_YEAR: i32 = 2024;

/// Suffixes DHIS2 appends to org unit names that UBOS does not use.
/// Stripped in this order when an exact lookup misses.
const NAME_SUFFIXES: [&str; 11] = [
    " DISTRICT",
    " CITY",
    " MUNICIPALITY",
    " TOWN COUNCIL",
    " SUB COUNTY",
    " SUBCOUNTY",
    " PARISH",
    " HC II",
    " HC III",
    " HC IV",
    " HOSPITAL",
];

#[rustfmt::skip]
const DISTRICT_POPULATIONS: [(&str, u64); 146] = [
    ("ABIM", 144_084), ("ADJUMANI", 297_894), ("AGAGO", 307_235),
    ("ALEBTONG", 283_509), ("AMOLATAR", 188_715), ("AMUDAT", 203_358),
    ("AMURIA", 251_653), ("AMURU", 240_814), ("APAC", 221_962),
    ("ARUA", 159_722), ("ARUA CITY", 384_656), ("BUDAKA", 281_537),
    ("BUDUDA", 268_970), ("BUGIRI", 480_345), ("BUGWERI", 211_511),
    ("BUHWEJU", 167_921), ("BUIKWE", 520_158), ("BUKEDEA", 282_864),
    ("BUKOMANSIMBI", 197_568), ("BUKWO", 114_396), ("BULAMBULI", 235_391),
    ("BULIISA", 167_894), ("BUNDIBUGYO", 264_778), ("BUNYANGABU", 219_012),
    ("BUSHENYI", 283_392), ("BUSIA", 412_671), ("BUTALEJA", 312_771),
    ("BUTAMBALA", 146_516), ("BUTEBO", 171_433), ("BUVUMA", 110_832),
    ("BUYENDE", 403_486), ("DOKOLO", 215_625), ("FORT PORTAL CITY", 137_549),
    ("GOMBA", 199_120), ("GULU", 135_373), ("GULU CITY", 233_271),
    ("HOIMA", 257_544), ("HOIMA CITY", 143_304), ("IBANDA", 309_466),
    ("IGANGA", 426_958), ("ISINGIRO", 635_077), ("JINJA", 280_905),
    ("JINJA CITY", 279_184), ("KAABONG", 264_631), ("KABALE", 285_588),
    ("KABAROLE", 230_368), ("KABERAMAIDO", 140_986), ("KAGADI", 471_111),
    ("KAKUMIRO", 428_176), ("KALAKI", 149_736), ("KALANGALA", 74_411),
    ("KALIRO", 286_397), ("KALUNGU", 221_569), ("KAMPALA", 1_797_722),
    ("KAMULI", 540_252), ("KAMWENGE", 337_167), ("KANUNGU", 310_062),
    ("KAPCHORWA", 133_621), ("KAPELEBYONG", 143_536), ("KARENGA", 100_375),
    ("KASESE", 853_831), ("KASSANDA", 314_008), ("KATAKWI", 234_332),
    ("KAYUNGA", 439_175), ("KAZO", 208_898), ("KIBAALE", 237_649),
    ("KIBOGA", 183_255), ("KIBUKU", 249_441), ("KIKUUBE", 379_547),
    ("KIRUHURA", 203_502), ("KIRYANDONGO", 364_872), ("KISORO", 433_662),
    ("KITAGWENDA", 184_947), ("KITGUM", 239_655), ("KOBOKO", 271_781),
    ("KOLE", 294_301), ("KOTIDO", 219_734), ("KUMI", 286_992),
    ("KWANIA", 216_125), ("KWEEN", 129_277), ("KYANKWANZI", 278_432),
    ("KYEGEGWA", 501_120), ("KYENJOJO", 543_998), ("KYOTERA", 275_917),
    ("LAMWO", 213_156), ("LIRA", 242_216), ("LIRA CITY", 245_132),
    ("LUUKA", 298_639), ("LUWEERO", 616_242), ("LWENGO", 325_263),
    ("LYANTONDE", 133_017), ("MADI-OKOLLO", 178_051), ("MANAFWA", 186_917),
    ("MARACHA", 234_712), ("MASAKA", 115_455), ("MASAKA CITY", 294_166),
    ("MASINDI", 342_635), ("MAYUGE", 577_563), ("MBALE", 290_356),
    ("MBALE CITY", 290_414), ("MBARARA", 174_039), ("MBARARA CITY", 264_425),
    ("MITOOMA", 226_009), ("MITYANA", 407_386), ("MOROTO", 103_639),
    ("MOYO", 109_572), ("MPIGI", 326_690), ("MUBENDE", 522_015),
    ("MUKONO", 929_224), ("NABILATUK", 136_785), ("NAKAPIRIPIRIT", 111_681),
    ("NAKASEKE", 251_398), ("NAKASONGOLA", 226_074), ("NAMAYINGO", 266_716),
    ("NAMISINDWA", 257_346), ("NAMUTUMBA", 311_339), ("NAPAK", 211_830),
    ("NEBBI", 299_398), ("NGORA", 213_777), ("NTOROKO", 114_858),
    ("NTUNGAMO", 552_786), ("NWOYA", 220_593), ("OBONGI", 142_983),
    ("OMORO", 207_339), ("OTUKE", 161_069), ("OYAM", 477_464),
    ("PADER", 240_159), ("PAKWACH", 206_961), ("PALLISA", 334_697),
    ("RAKAI", 346_885), ("RUBANDA", 249_454), ("RUBIRIZI", 168_211),
    ("RUKIGA", 132_355), ("RUKUNGIRI", 376_110), ("RWAMPARA", 162_967),
    ("SERERE", 358_123), ("SHEEMA", 252_275), ("SIRONKO", 298_363),
    ("SOROTI", 266_189), ("SOROTI CITY", 134_199), ("SSEMBABULE", 305_971),
    ("TEREGO", 323_253), ("TORORO", 609_939), ("WAKISO", 3_411_177),
    ("YUMBE", 945_100), ("ZOMBO", 312_621),
];

fn district_table() -> &'static HashMap<&'static str, u64> {
    static TABLE: OnceLock<HashMap<&'static str, u64>> = OnceLock::new();
    TABLE.get_or_init(|| DISTRICT_POPULATIONS.iter().copied().collect())
}

/// Upper-case a DHIS2 name and strip the suffixes UBOS does not carry, so
/// `"Gulu District"` matches `"GULU"`.
pub fn clean_district_name(name: &str) -> String {
    let mut cleaned = name.trim().to_uppercase();
    for suffix in NAME_SUFFIXES {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.trim().to_string();
        }
    }
    cleaned
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationRegistry {
    /// Facility id to catchment population.
    catchments: HashMap<String, u64>,
}

impl PopulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catchments(catchments: HashMap<String, u64>) -> Self {
        Self { catchments }
    }

    pub fn year(&self) -> i32 {
        POPULATION_YEAR
    }

    /// Population for a district name as DHIS2 displays it. The exact
    /// upper-cased name is tried first so `"Arua City"` does not collapse
    /// into `"ARUA"`.
    pub fn population(&self, district_name: &str) -> Option<u64> {
        let table = district_table();
        let exact = district_name.trim().to_uppercase();
        table
            .get(exact.as_str())
            .or_else(|| table.get(clean_district_name(district_name).as_str()))
            .copied()
    }

    pub fn custom_catchment(&self, facility_id: &str) -> Option<u64> {
        self.catchments.get(facility_id).copied()
    }

    pub fn set_catchment(&mut self, facility_id: &str, population: u64) {
        self.catchments.insert(facility_id.to_string(), population);
    }

    pub fn clear_catchment(&mut self, facility_id: &str) -> Option<u64> {
        self.catchments.remove(facility_id)
    }

    /// Sum of every district estimate.
    pub fn national_total(&self) -> u64 {
        district_table().values().sum()
    }

    pub fn district_count(&self) -> usize {
        district_table().len()
    }

    /// All districts, alphabetically.
    pub fn districts(&self) -> Vec<(&'static str, u64)> {
        let mut all = DISTRICT_POPULATIONS.to_vec();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_all_districts() {
        let registry = PopulationRegistry::new();
        assert_eq!(registry.district_count(), 146);
        assert_eq!(registry.national_total(), 45_895_961);
    }

    #[test]
    fn test_clean_district_name() {
        assert_eq!(clean_district_name("Gulu District"), "GULU");
        assert_eq!(clean_district_name("  kampala  "), "KAMPALA");
        assert_eq!(clean_district_name("Awach HC IV"), "AWACH");
        assert_eq!(clean_district_name("Bungatira Subcounty"), "BUNGATIRA");
    }

    #[test]
    fn test_lookup_prefers_exact_name() {
        let registry = PopulationRegistry::new();
        assert_eq!(registry.population("Arua City"), Some(384_656));
        assert_eq!(registry.population("Arua District"), Some(159_722));
        assert_eq!(registry.population("Gulu"), Some(135_373));
        assert_eq!(registry.population("Atlantis District"), None);
    }

    #[test]
    fn test_catchment_overrides() {
        let mut registry = PopulationRegistry::new();
        assert_eq!(registry.custom_catchment("FAC"), None);
        registry.set_catchment("FAC", 12_000);
        assert_eq!(registry.custom_catchment("FAC"), Some(12_000));
        assert_eq!(registry.clear_catchment("FAC"), Some(12_000));
        assert_eq!(registry.custom_catchment("FAC"), None);
    }
}
