//! Variable catalog: request names to in-file short names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use reanalysis_common::{RasterError, RasterResult};

/// ERA5 single-level variables and their short names.
const ERA5_SINGLE_LEVELS: &[(&str, &str)] = &[
    ("2m_temperature", "t2m"),
    ("2m_dewpoint_temperature", "d2m"),
    ("skin_temperature", "skt"),
    ("sea_surface_temperature", "sst"),
    ("10m_u_component_of_wind", "u10"),
    ("10m_v_component_of_wind", "v10"),
    ("100m_u_component_of_wind", "u100"),
    ("100m_v_component_of_wind", "v100"),
    ("mean_sea_level_pressure", "msl"),
    ("surface_pressure", "sp"),
    ("total_precipitation", "tp"),
    ("total_cloud_cover", "tcc"),
    ("total_column_water_vapour", "tcwv"),
    ("surface_solar_radiation_downwards", "ssrd"),
    ("boundary_layer_height", "blh"),
    ("convective_available_potential_energy", "cape"),
    ("snow_depth", "sd"),
    ("sea_ice_cover", "siconc"),
];

/// Lookup from the variable name used in requests and file names
/// (`2m_temperature`) to the array name inside each file (`t2m`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableCatalog {
    entries: BTreeMap<String, String>,
}

impl VariableCatalog {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The ERA5 single-level table.
    pub fn era5() -> Self {
        ERA5_SINGLE_LEVELS
            .iter()
            .map(|(name, short)| (name.to_string(), short.to_string()))
            .collect()
    }

    /// Short name for `variable`, or `InvalidParameter` if it is unknown.
    pub fn short_name(&self, variable: &str) -> RasterResult<&str> {
        self.entries
            .get(variable)
            .map(String::as_str)
            .ok_or_else(|| RasterError::invalid_parameter("variable", variable))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VariableCatalog {
    fn default() -> Self {
        Self::era5()
    }
}

impl FromIterator<(String, String)> for VariableCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_era5_table() {
        let catalog = VariableCatalog::default();
        assert_eq!(catalog.short_name("2m_temperature").unwrap(), "t2m");
        assert_eq!(catalog.short_name("total_precipitation").unwrap(), "tp");
        assert_eq!(catalog.len(), ERA5_SINGLE_LEVELS.len());
    }

    #[test]
    fn test_unknown_variable_is_invalid_parameter() {
        let err = VariableCatalog::era5().short_name("t2m").unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(err.to_string().contains("'variable'"));
    }

    #[test]
    fn test_deserialize_as_plain_map() {
        let catalog: VariableCatalog =
            serde_json::from_str(r#"{"soil_temperature_level_1": "stl1"}"#).unwrap();
        assert_eq!(catalog.short_name("soil_temperature_level_1").unwrap(), "stl1");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.short_name("2m_temperature").is_err());
    }
}
