mod field;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use field::{Field, UNKNOWN};

/// Neighborhood score rendered as `X/100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Score(pub u8);

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

impl TryFrom<String> for Score {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.trim()
            .trim_end_matches("/100")
            .parse::<u8>()
            .ok()
            .filter(|score| *score <= 100)
            .map(Score)
            .ok_or_else(|| format!("invalid score: {raw}"))
    }
}

impl From<Score> for String {
    fn from(score: Score) -> Self {
        score.to_string()
    }
}

/// Severity bucket used by the climate risk factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Minimal,
    Minor,
    Moderate,
    Major,
    Severe,
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(RiskLevel::Minimal),
            "minor" => Ok(RiskLevel::Minor),
            "moderate" => Ok(RiskLevel::Moderate),
            "major" => Ok(RiskLevel::Major),
            "severe" => Ok(RiskLevel::Severe),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Minimal => "Minimal",
            RiskLevel::Minor => "Minor",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Major => "Major",
            RiskLevel::Severe => "Severe",
        };
        f.write_str(label)
    }
}

/// Climate risk rendered as `Level (n/10)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RiskRating {
    pub level: RiskLevel,
    pub score: u8,
}

impl fmt::Display for RiskRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/10)", self.level, self.score)
    }
}

impl TryFrom<String> for RiskRating {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let (level, rest) = raw
            .split_once('(')
            .ok_or_else(|| format!("invalid risk rating: {raw}"))?;
        let score = rest
            .trim_end_matches(')')
            .trim_end_matches("/10")
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("invalid risk score: {raw}"))?;
        Ok(RiskRating {
            level: level.parse()?,
            score,
        })
    }
}

impl From<RiskRating> for String {
    fn from(rating: RiskRating) -> Self {
        rating.to_string()
    }
}

/// Assigned school for one grade level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub name: Field<String>,
    pub distance: Field<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utilities {
    pub electric: Field<String>,
    pub sewer: Field<String>,
    pub water: Field<String>,
    pub other: Field<String>,
}

impl Utilities {
    pub fn is_empty(&self) -> bool {
        !(self.electric.is_known()
            || self.sewer.is_known()
            || self.water.is_known()
            || self.other.is_known())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parking {
    pub total_spaces: Field<u32>,
    pub garage_spaces: Field<u32>,
    pub features: Field<String>,
    pub uncovered_spaces: Field<String>,
}

impl Parking {
    pub fn is_empty(&self) -> bool {
        !(self.total_spaces.is_known()
            || self.garage_spaces.is_known()
            || self.features.is_known()
            || self.uncovered_spaces.is_known())
    }
}

/// One row of a listing's price history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub date: String,
    pub event: String,
    pub price: String,
}

impl fmt::Display for HistoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.date, self.event, self.price)
    }
}

/// Snapshot of a single listing page.
///
/// Every field is always present; anything the extractors could not find is
/// left as [`Field::Unknown`] (or an empty list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub image_url: Field<String>,

    pub price: Field<u64>,
    pub beds: Field<u8>,
    pub baths: Field<f32>,
    pub sqft: Field<u32>,
    pub sqft_lot: Field<String>,
    pub address: Field<String>,
    pub property_type: Field<String>,
    pub year_built: Field<u16>,
    pub price_per_sqft: Field<u32>,
    pub estimated_monthly_payment: Field<u32>,
    pub region: Field<String>,

    pub interior_features: Vec<String>,
    pub other_rooms: Vec<String>,
    pub appliances: Vec<String>,
    pub utilities: Field<Utilities>,
    pub parking: Field<Parking>,

    pub walk_score: Field<Score>,
    pub bike_score: Field<Score>,
    pub transit_score: Field<Score>,

    pub elementary_school: School,
    pub middle_school: School,
    pub high_school: School,

    pub flood_risk: Field<RiskRating>,
    pub fire_risk: Field<RiskRating>,
    pub wind_risk: Field<RiskRating>,
    pub air_risk: Field<RiskRating>,
    pub heat_risk: Field<RiskRating>,

    pub nearby_cities: Vec<String>,
    pub property_history: Vec<HistoryEvent>,
}

impl ListingRecord {
    /// Fresh record with every fact unknown
    pub fn new(url: impl Into<String>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            scraped_at,
            image_url: Field::Unknown,
            price: Field::Unknown,
            beds: Field::Unknown,
            baths: Field::Unknown,
            sqft: Field::Unknown,
            sqft_lot: Field::Unknown,
            address: Field::Unknown,
            property_type: Field::Unknown,
            year_built: Field::Unknown,
            price_per_sqft: Field::Unknown,
            estimated_monthly_payment: Field::Unknown,
            region: Field::Unknown,
            interior_features: Vec::new(),
            other_rooms: Vec::new(),
            appliances: Vec::new(),
            utilities: Field::Unknown,
            parking: Field::Unknown,
            walk_score: Field::Unknown,
            bike_score: Field::Unknown,
            transit_score: Field::Unknown,
            elementary_school: School::default(),
            middle_school: School::default(),
            high_school: School::default(),
            flood_risk: Field::Unknown,
            fire_risk: Field::Unknown,
            wind_risk: Field::Unknown,
            air_risk: Field::Unknown,
            heat_risk: Field::Unknown,
            nearby_cities: Vec::new(),
            property_history: Vec::new(),
        }
    }

    /// Column names of the flattened projection, identical for every record
    pub fn columns() -> Vec<&'static str> {
        ListingRecord::new(String::new(), Utc::now())
            .flatten()
            .into_iter()
            .map(|(column, _)| column)
            .collect()
    }

    /// Flattens nested structures into scalar columns.
    ///
    /// Lists are joined with `"; "`, nested structs become `parent_child`
    /// columns and anything missing renders as the unknown sentinel.
    pub fn flatten(&self) -> Vec<(&'static str, String)> {
        vec![
            ("url", self.url.clone()),
            ("scraped_at", self.scraped_at.to_rfc3339()),
            ("image_url", self.image_url.to_string()),
            ("price", self.price.to_string()),
            ("beds", self.beds.to_string()),
            ("baths", self.baths.to_string()),
            ("sqft", self.sqft.to_string()),
            ("sqft_lot", self.sqft_lot.to_string()),
            ("address", self.address.to_string()),
            ("property_type", self.property_type.to_string()),
            ("year_built", self.year_built.to_string()),
            ("price_per_sqft", self.price_per_sqft.to_string()),
            (
                "estimated_monthly_payment",
                self.estimated_monthly_payment.to_string(),
            ),
            ("region", self.region.to_string()),
            ("interior_features", join(&self.interior_features)),
            ("other_rooms", join(&self.other_rooms)),
            ("appliances", join(&self.appliances)),
            ("utilities_electric", nested(&self.utilities, |u| &u.electric)),
            ("utilities_sewer", nested(&self.utilities, |u| &u.sewer)),
            ("utilities_water", nested(&self.utilities, |u| &u.water)),
            ("utilities_other", nested(&self.utilities, |u| &u.other)),
            ("parking_total_spaces", nested(&self.parking, |p| &p.total_spaces)),
            ("parking_garage_spaces", nested(&self.parking, |p| &p.garage_spaces)),
            ("parking_features", nested(&self.parking, |p| &p.features)),
            (
                "parking_uncovered_spaces",
                nested(&self.parking, |p| &p.uncovered_spaces),
            ),
            ("walk_score", self.walk_score.to_string()),
            ("bike_score", self.bike_score.to_string()),
            ("transit_score", self.transit_score.to_string()),
            (
                "elementary_school_name",
                self.elementary_school.name.to_string(),
            ),
            (
                "elementary_school_distance",
                self.elementary_school.distance.to_string(),
            ),
            ("middle_school_name", self.middle_school.name.to_string()),
            (
                "middle_school_distance",
                self.middle_school.distance.to_string(),
            ),
            ("high_school_name", self.high_school.name.to_string()),
            ("high_school_distance", self.high_school.distance.to_string()),
            ("flood_risk", self.flood_risk.to_string()),
            ("fire_risk", self.fire_risk.to_string()),
            ("wind_risk", self.wind_risk.to_string()),
            ("air_risk", self.air_risk.to_string()),
            ("heat_risk", self.heat_risk.to_string()),
            ("nearby_cities", join(&self.nearby_cities)),
            ("property_history", join(&self.property_history)),
        ]
    }
}

fn nested<P, T: fmt::Display>(parent: &Field<P>, pick: fn(&P) -> &Field<T>) -> String {
    match parent {
        Field::Known(inner) => pick(inner).to_string(),
        Field::Unknown => UNKNOWN.to_string(),
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return UNKNOWN.to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_has_every_key() {
        let record = ListingRecord::new("https://example.com/homedetails/1_zpid/", Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();

        for key in [
            "price",
            "beds",
            "baths",
            "sqft",
            "sqft_lot",
            "utilities",
            "parking",
            "walk_score",
            "flood_risk",
            "heat_risk",
            "elementary_school",
            "nearby_cities",
            "property_history",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(object["beds"], "N/A");
        assert_eq!(object["utilities"], "N/A");
        assert_eq!(object["high_school"]["name"], "N/A");
    }

    #[test]
    fn flatten_keeps_columns_stable_whether_nested_values_are_known_or_not() {
        let empty = ListingRecord::new("a", Utc::now());
        let mut full = ListingRecord::new("b", Utc::now());
        full.utilities = Field::Known(Utilities {
            electric: Field::Known("220 Volts".into()),
            ..Utilities::default()
        });
        full.parking = Field::Known(Parking {
            garage_spaces: Field::Known(2),
            ..Parking::default()
        });
        full.nearby_cities = vec!["Salem".into(), "Lynn".into()];

        let empty_columns: Vec<_> = empty.flatten().into_iter().map(|(c, _)| c).collect();
        let full_flat = full.flatten();
        let full_columns: Vec<_> = full_flat.iter().map(|(c, _)| *c).collect();
        assert_eq!(empty_columns, full_columns);
        assert_eq!(empty_columns, ListingRecord::columns());

        let value = |column: &str| {
            full_flat
                .iter()
                .find(|(c, _)| *c == column)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(value("utilities_electric"), "220 Volts");
        assert_eq!(value("utilities_water"), "N/A");
        assert_eq!(value("parking_garage_spaces"), "2");
        assert_eq!(value("nearby_cities"), "Salem; Lynn");
    }

    #[test]
    fn ratings_render_and_parse() {
        let rating = RiskRating {
            level: RiskLevel::Moderate,
            score: 4,
        };
        assert_eq!(rating.to_string(), "Moderate (4/10)");
        assert_eq!(RiskRating::try_from(rating.to_string()).unwrap(), rating);
        assert_eq!(Score::try_from("87/100".to_string()).unwrap(), Score(87));
        assert!(Score::try_from("187/100".to_string()).is_err());
    }

    #[test]
    fn record_survives_a_checkpoint_round_trip() {
        let mut record = ListingRecord::new("https://example.com/x", Utc::now());
        record.baths = Field::Known(2.5);
        record.walk_score = Field::Known(Score(91));
        record.address = Field::Known("N/A".to_string());

        let json = serde_json::to_string(&record).unwrap();
        let back: ListingRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.baths, Field::Known(2.5));
        assert_eq!(back.walk_score, Field::Known(Score(91)));
        // the sentinel is reserved, so a literal "N/A" reads back as unknown
        assert_eq!(back.address, Field::Unknown);
    }
}
