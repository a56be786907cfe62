//! Static soil knowledge base
//!
//! Agronomic reference text and typical-occurrence regions per soil type.
//! The table is compiled in and never mutated; lookups for labels without an
//! entry fall back to [`DEFAULT_ENTRY`] instead of failing.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Text shown for any topic of a soil type without reference data
pub const NO_DATA: &str = "No data available.";

/// Neutral map coordinate (geographic centre of India)
pub const DEFAULT_LATITUDE: f64 = 22.9734;
pub const DEFAULT_LONGITUDE: f64 = 78.6569;

/// A named region where a soil type typically occurs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reference data for one soil label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeEntry {
    pub label: &'static str,
    pub crops: &'static str,
    pub deficiency: &'static str,
    pub fertilizers: &'static str,
    pub tips: &'static str,
    pub locations: &'static [Region],
}

/// The four reference text topics of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Topic {
    Crops,
    Deficiency,
    Fertilizers,
    Tips,
}

impl Topic {
    /// All topics in report order
    pub const ALL: [Topic; 4] = [Topic::Crops, Topic::Deficiency, Topic::Fertilizers, Topic::Tips];

    /// Display heading
    pub fn title(&self) -> &'static str {
        match self {
            Topic::Crops => "Crops Cultivatable",
            Topic::Deficiency => "Nutrient Deficiency",
            Topic::Fertilizers => "Recommended Fertilizers",
            Topic::Tips => "Tips to Improve Soil",
        }
    }
}

impl KnowledgeEntry {
    /// Text for one topic, verbatim
    pub fn text(&self, topic: Topic) -> &'static str {
        match topic {
            Topic::Crops => self.crops,
            Topic::Deficiency => self.deficiency,
            Topic::Fertilizers => self.fertilizers,
            Topic::Tips => self.tips,
        }
    }

    /// True for the "no data" fallback entry
    pub fn is_default(&self) -> bool {
        std::ptr::eq(self, &DEFAULT_ENTRY)
    }
}

/// Fallback entry returned for labels missing from the table
pub static DEFAULT_ENTRY: KnowledgeEntry = KnowledgeEntry {
    label: "Unknown",
    crops: NO_DATA,
    deficiency: NO_DATA,
    fertilizers: NO_DATA,
    tips: NO_DATA,
    locations: &[Region {
        name: "India",
        latitude: DEFAULT_LATITUDE,
        longitude: DEFAULT_LONGITUDE,
    }],
};

static SOIL_TABLE: &[KnowledgeEntry] = &[
    KnowledgeEntry {
        label: "Sand",
        crops: "Sandy soil is ideal for root crops like carrots, radishes, and potatoes, which require well-draining, loose textures. It also supports crops such as peanuts, watermelon, and cucumbers due to its ability to warm up quickly and provide good aeration. However, it requires more frequent irrigation and nutrient management.",
        deficiency: "Sandy soil often lacks essential nutrients like nitrogen, potassium, and phosphorus due to its high drainage capacity. Organic matter content is typically very low, making it poor at retaining water and nutrients for long durations.",
        fertilizers: "Apply compost and well-rotted manure regularly to build organic matter. Use slow-release nitrogen fertilizers or liquid feeds to address nutrient leaching. Mulching helps reduce evaporation.",
        tips: "Mix organic materials such as compost, peat moss, and vermiculite to improve moisture retention and nutrient-holding capacity. Use ground covers and mulch to reduce wind and water erosion. Implement crop rotation and cover cropping.",
        locations: &[
            Region { name: "Rajasthan", latitude: 27.0238, longitude: 74.2179 },
            Region { name: "Punjab", latitude: 31.1471, longitude: 75.3412 },
        ],
    },
    KnowledgeEntry {
        label: "Silt",
        crops: "Silt soils, being fertile and holding moisture well, support crops like rice, wheat, and vegetables. Their smooth texture aids root expansion, while high fertility ensures consistent yields. They are often found near rivers.",
        deficiency: "May suffer from compaction and poor drainage over time, leading to lower oxygen availability for roots. Nutrient levels can drop with overuse of chemical fertilizers without organic matter replacement.",
        fertilizers: "Add well-rotted manure or green manure to enhance structure and fertility. Phosphorus and potassium supplements improve root growth and flowering in vegetable crops.",
        tips: "To avoid crusting, reduce heavy foot or machinery traffic. Add organic material and sand to improve aeration. Regular tilling and using raised beds help drainage.",
        locations: &[
            Region { name: "Uttar Pradesh", latitude: 26.8467, longitude: 80.9462 },
        ],
    },
    KnowledgeEntry {
        label: "Clay",
        crops: "Clay soils are nutrient-rich and retain moisture well, ideal for crops like broccoli, cabbage, and leafy greens. Their density also supports rice cultivation in paddy fields where water stagnation is beneficial.",
        deficiency: "Though rich in minerals, clay soil may lack organic matter and drain poorly. This can cause root diseases and stunted growth in some plants.",
        fertilizers: "Apply compost and aged manure to improve structure and organic matter. Use gypsum to reduce compaction. Slow-release fertilizers prevent nutrient lockup.",
        tips: "Work soil in dry conditions. Add organic matter consistently. Double digging and raised beds help aeration. Avoid walking on wet clay to prevent compaction.",
        locations: &[
            Region { name: "Tamil Nadu", latitude: 11.1271, longitude: 78.6569 },
        ],
    },
    KnowledgeEntry {
        label: "Loam",
        crops: "Loamy soil is considered the best agricultural soil due to its balanced sand, silt, and clay composition. It supports nearly all crops such as maize, cotton, sugarcane, pulses, and vegetables.",
        deficiency: "Rarely deficient, but overuse can deplete nitrogen and phosphorus. Careful rotation prevents micronutrient loss.",
        fertilizers: "Compost and balanced NPK fertilizers maintain long-term fertility. Mulching prevents leaching.",
        tips: "Avoid over-tilling to maintain structure. Rotate crops and include legumes. Maintain pH with lime or sulfur if necessary.",
        locations: &[
            Region { name: "Haryana", latitude: 29.0588, longitude: 76.0856 },
        ],
    },
    KnowledgeEntry {
        label: "Peat",
        crops: "Peat soil, being high in organic matter and moisture, is excellent for root vegetables like carrots and turnips. It also supports legumes and brassicas when properly drained.",
        deficiency: "Often acidic and low in minerals like iron, manganese, and molybdenum. Requires liming and trace element supplementation.",
        fertilizers: "Use lime to reduce acidity, and apply micronutrient-rich fertilizers. Add sand to improve drainage.",
        tips: "Drain excess water through channels. Mix in sand or loam for structure. Regularly test pH and adjust.",
        locations: &[
            Region { name: "Kerala", latitude: 10.8505, longitude: 76.2711 },
        ],
    },
    KnowledgeEntry {
        label: "Chalk",
        crops: "Chalky soils suit crops like barley, beans, spinach, and cabbage. They thrive in alkaline conditions and require adequate watering.",
        deficiency: "Commonly lacks iron, manganese, and potassium. High pH can lead to nutrient lockout.",
        fertilizers: "Use acidifying fertilizers (ammonium sulfate), seaweed, and chelated iron sprays.",
        tips: "Add compost and acidic organic matter. Avoid over-liming. Grow green manures to retain moisture.",
        locations: &[
            Region { name: "Himachal Pradesh", latitude: 31.1048, longitude: 77.1734 },
        ],
    },
    KnowledgeEntry {
        label: "Alluvial Soil",
        crops: "Highly fertile and found in river plains, supports paddy, wheat, sugarcane, maize, and pulses. Ideal for intensive cropping.",
        deficiency: "May be deficient in nitrogen and phosphorus due to leaching in flood-prone zones.",
        fertilizers: "Apply nitrogen and phosphorus-based fertilizers like urea and DAP. Use vermicompost for sustainability.",
        tips: "Use green manures post-harvest. Employ bunding and contour farming to reduce erosion.",
        locations: &[
            Region { name: "Bihar", latitude: 25.0961, longitude: 85.3131 },
            Region { name: "West Bengal", latitude: 22.9868, longitude: 87.855 },
        ],
    },
    KnowledgeEntry {
        label: "Black Cotton Soil (Regur)",
        crops: "Excellent for cotton, soybean, sorghum, and sunflower. High moisture retention aids growth in dry regions.",
        deficiency: "Deficient in nitrogen, phosphorus, and organic carbon. High in calcium and magnesium.",
        fertilizers: "Add nitrogenous and phosphatic fertilizers. Apply FYM and compost.",
        tips: "Deep ploughing post-monsoon helps cracking soil structure. Use contour bunding.",
        locations: &[
            Region { name: "Maharashtra", latitude: 19.7515, longitude: 75.7139 },
            Region { name: "Madhya Pradesh", latitude: 22.9734, longitude: 78.6569 },
        ],
    },
    KnowledgeEntry {
        label: "Red and Yellow Soil",
        crops: "Suitable for millets, pulses, groundnut, and oilseeds. Common in eastern and central India.",
        deficiency: "Low in nitrogen, phosphorus, and humus. Prone to erosion.",
        fertilizers: "Incorporate farmyard manure and green manure. Apply balanced NPK blends.",
        tips: "Terracing and afforestation help prevent erosion. Use mulching for moisture.",
        locations: &[
            Region { name: "Odisha", latitude: 20.9517, longitude: 85.0985 },
            Region { name: "Chhattisgarh", latitude: 21.2787, longitude: 81.8661 },
        ],
    },
    KnowledgeEntry {
        label: "Laterite Soil",
        crops: "Grows tea, coffee, cashew, rubber, and coconut in high rainfall areas.",
        deficiency: "Low fertility due to leaching. Deficient in lime, potash, and phosphoric acid.",
        fertilizers: "Apply lime and organic compost. Supplement with potassium-rich fertilizers.",
        tips: "Use raised beds to counter waterlogging. Replenish nutrients annually.",
        locations: &[
            Region { name: "Goa", latitude: 15.2993, longitude: 74.124 },
            Region { name: "Karnataka", latitude: 15.3173, longitude: 75.7139 },
            Region { name: "Kerala", latitude: 10.8505, longitude: 76.2711 },
        ],
    },
];

static BUILTIN: Lazy<KnowledgeBase> = Lazy::new(|| KnowledgeBase::from_table(SOIL_TABLE));

/// Read-only lookup from soil label to reference entry
#[derive(Debug)]
pub struct KnowledgeBase {
    entries: &'static [KnowledgeEntry],
    index: HashMap<&'static str, usize>,
}

impl KnowledgeBase {
    /// The compiled-in soil table
    pub fn builtin() -> &'static KnowledgeBase {
        &BUILTIN
    }

    fn from_table(entries: &'static [KnowledgeEntry]) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.label, i))
            .collect();
        Self { entries, index }
    }

    /// Entry for `label`, or [`DEFAULT_ENTRY`] when there is none
    pub fn get(&self, label: &str) -> &'static KnowledgeEntry {
        match self.index.get(label) {
            Some(&i) => &self.entries[i],
            None => &DEFAULT_ENTRY,
        }
    }

    /// Whether `label` has its own entry
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// All entries in table order
    pub fn entries(&self) -> &'static [KnowledgeEntry] {
        self.entries
    }
}
