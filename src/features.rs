//! Single-row feature assembly.
//!
//! A [`FeatureRecord`] is the one-row table the pipeline consumes. Columns
//! are addressed by the names the pipeline was fitted with, so the artifact
//! can select them the same way it would from a dataframe.

use std::fmt;

use crate::types::AreaInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    StateName,
    DistrictName,
    Season,
    Crop,
    Area,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::StateName,
        Column::DistrictName,
        Column::Season,
        Column::Crop,
        Column::Area,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::StateName => "State_Name",
            Column::DistrictName => "District_Name",
            Column::Season => "Season",
            Column::Crop => "Crop",
            Column::Area => "Area",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Column::Area)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of one cell in the record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(Option<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub state_name: String,
    pub district_name: String,
    pub season: String,
    pub crop: String,
    /// `None` is the missing marker; never an unparsed string.
    pub area: Option<f64>,
}

impl FeatureRecord {
    /// Categoricals pass through untouched, Area goes through [`clean_numeric`].
    pub fn assemble(
        state: &str,
        district: &str,
        season: &str,
        crop: &str,
        area: &AreaInput,
    ) -> Self {
        Self {
            state_name: state.to_string(),
            district_name: district.to_string(),
            season: season.to_string(),
            crop: crop.to_string(),
            area: clean_numeric(Some(area)),
        }
    }

    pub fn get(&self, column: Column) -> Cell<'_> {
        match column {
            Column::StateName => Cell::Text(&self.state_name),
            Column::DistrictName => Cell::Text(&self.district_name),
            Column::Season => Cell::Text(&self.season),
            Column::Crop => Cell::Text(&self.crop),
            Column::Area => Cell::Number(self.area),
        }
    }

    pub(crate) fn set_text(&mut self, column: Column, value: &str) {
        let slot = match column {
            Column::StateName => &mut self.state_name,
            Column::DistrictName => &mut self.district_name,
            Column::Season => &mut self.season,
            Column::Crop => &mut self.crop,
            Column::Area => return,
        };
        *slot = value.to_string();
    }
}

/// Strips thousands separators and coerces to a number.
///
/// Anything that does not parse (including null) becomes `None`; NaN is
/// folded into the same marker so downstream code only has one notion of
/// "missing".
pub fn clean_numeric(raw: Option<&AreaInput>) -> Option<f64> {
    let value = match raw? {
        AreaInput::Number(v) => *v,
        AreaInput::Text(s) => s.replace(',', "").trim().parse::<f64>().ok()?,
    };
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> AreaInput {
        AreaInput::Text(s.to_string())
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(clean_numeric(Some(&text("1,234"))), Some(1234.0));
        assert_eq!(clean_numeric(Some(&text("12,345,678.5"))), Some(12_345_678.5));
        assert_eq!(clean_numeric(Some(&text(" 2,500 "))), Some(2500.0));
    }

    #[test]
    fn unparsable_values_become_missing() {
        assert_eq!(clean_numeric(Some(&text("abc"))), None);
        assert_eq!(clean_numeric(Some(&text(""))), None);
        assert_eq!(clean_numeric(Some(&text(",,,"))), None);
        assert_eq!(clean_numeric(Some(&text("nan"))), None);
        assert_eq!(clean_numeric(None), None);
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(clean_numeric(Some(&AreaInput::Number(2500.0))), Some(2500.0));
        assert_eq!(clean_numeric(Some(&AreaInput::Number(f64::NAN))), None);
        assert_eq!(
            clean_numeric(Some(&text("inf"))),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn assemble_keeps_categoricals_opaque() {
        let rec = FeatureRecord::assemble(
            "Andaman and Nicobar Islands",
            "NICOBARS",
            "Kharif     ",
            "Arecanut",
            &text("1,254"),
        );
        assert_eq!(rec.get(Column::Season), Cell::Text("Kharif     "));
        assert_eq!(rec.get(Column::Area), Cell::Number(Some(1254.0)));
    }

    #[test]
    fn column_names_round_trip() {
        for c in Column::ALL {
            assert_eq!(Column::from_name(c.name()), Some(c));
        }
        assert_eq!(Column::from_name("Crop_Year"), None);
        assert!(Column::Area.is_numeric());
        assert!(!Column::Crop.is_numeric());
    }
}
