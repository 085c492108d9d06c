//! Corrosion rates of a pipeline caused by the acids left after the reactions.
//!
//! Acid concentrations are molar ppm in the CO2 stream, the flowrate is in Mt CO2 per year,
//! rates are returned in mm per year.
use crate::Reactions::concentrations::ConcentrationVector;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

// g/mol
pub const H2O_MOL_WEIGHT: f64 = 18.0;
pub const FE_MOL_WEIGHT: f64 = 56.0;
pub const CO2_MOL_WEIGHT: f64 = 44.0;
pub const H2SO4_MOL_WEIGHT: f64 = 98.0;
pub const HNO3_MOL_WEIGHT: f64 = 63.01;
// g/cm3
pub const FE_DENSITY_S: f64 = 7.87;

/// geometry of the pipe and the CO2 flow through it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeInputs {
    /// inch
    #[serde(alias = "innerDiameter")]
    pub inner_diameter: f64,
    /// m
    #[serde(alias = "dropOutLength")]
    pub drop_out_length: f64,
    /// Mt/year
    pub flowrate: f64,
}

impl Default for PipeInputs {
    fn default() -> Self {
        Self {
            inner_diameter: 30.0,
            drop_out_length: 1000.0,
            flowrate: 20.0,
        }
    }
}

impl PipeInputs {
    pub fn surface_area(&self) -> f64 {
        surface_area(self.inner_diameter, self.drop_out_length)
    }
}

/// inner surface in cm2 of a pipe with diameter in inch and length in m
pub fn surface_area(inner_diameter: f64, drop_out_length: f64) -> f64 {
    PI * inner_diameter * 2.54 * drop_out_length * 100.0
}

/// iron loss rate in cm3/hour over a surface in cm2 -> wall loss in mm/year
pub fn corrosion_rate(rate: f64, surface_area: f64) -> f64 {
    rate * 8760.0 * 10.0 / surface_area
}

/// mol/hour of iron -> cm3/hour
pub fn convert_iron_rate(mol_rate: f64) -> f64 {
    mol_rate * FE_MOL_WEIGHT / FE_DENSITY_S
}

// mol/hour of acid carried by the stream
fn acid_molar_flow(flowrate: f64, acid_mol_weight: f64, molar_rate: f64) -> f64 {
    let flowrate = flowrate * 1e6 / (24.0 * 365.0); // ton/hour
    let mass_concentration = acid_mol_weight / CO2_MOL_WEIGHT * molar_rate; // mg/kg
    let acid_flowrate = mass_concentration * flowrate; // g/hour
    acid_flowrate / acid_mol_weight
}

/// one mol of H2SO4 dissolves one mol of iron
pub fn corrosion_rate_h2so4(surface_area: f64, flowrate: f64, molar_rate_h2so4: f64) -> f64 {
    let iron_rate = acid_molar_flow(flowrate, H2SO4_MOL_WEIGHT, molar_rate_h2so4);
    corrosion_rate(convert_iron_rate(iron_rate), surface_area)
}

pub fn corrosion_rate_hno3(surface_area: f64, flowrate: f64, molar_rate_hno3: f64) -> f64 {
    let iron_rate = acid_molar_flow(flowrate, HNO3_MOL_WEIGHT, molar_rate_hno3);
    corrosion_rate(convert_iron_rate(iron_rate), surface_area) / 6.0
}

/// scalars derived from a final vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrosionMetric {
    #[serde(rename = "H2SO4_corrosion")]
    H2SO4Corrosion,
    #[serde(rename = "HNO3_corrosion")]
    HNO3Corrosion,
    #[serde(rename = "corrosion_rate")]
    CorrosionRate,
}

impl CorrosionMetric {
    pub const ALL: [CorrosionMetric; 3] = [
        CorrosionMetric::H2SO4Corrosion,
        CorrosionMetric::HNO3Corrosion,
        CorrosionMetric::CorrosionRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CorrosionMetric::H2SO4Corrosion => "H2SO4_corrosion",
            CorrosionMetric::HNO3Corrosion => "HNO3_corrosion",
            CorrosionMetric::CorrosionRate => "corrosion_rate",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            CorrosionMetric::H2SO4Corrosion => "H₂SO₄ corrosion (mm/y)",
            CorrosionMetric::HNO3Corrosion => "HNO₃ corrosion (mm/y)",
            CorrosionMetric::CorrosionRate => "Corrosion rate (mm/y)",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn evaluate(&self, concentrations: &ConcentrationVector, pipe: &PipeInputs) -> f64 {
        let area = pipe.surface_area();
        let h2so4 = || corrosion_rate_h2so4(area, pipe.flowrate, concentrations.get("H2SO4"));
        let hno3 = || corrosion_rate_hno3(area, pipe.flowrate, concentrations.get("HNO3"));
        match self {
            CorrosionMetric::H2SO4Corrosion => h2so4(),
            CorrosionMetric::HNO3Corrosion => hno3(),
            CorrosionMetric::CorrosionRate => h2so4() + hno3(),
        }
    }
}

impl fmt::Display for CorrosionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_corrosion_rate_steps() {
        let flowrate = 20.0 * 1e6 / (24.0 * 365.0);
        let carbon_concentration = H2SO4_MOL_WEIGHT / CO2_MOL_WEIGHT * 3.0;
        assert_relative_eq!(carbon_concentration, 6.6818182, epsilon = 1e-6);
        let carbon_flowrate = carbon_concentration * flowrate;
        assert_relative_eq!(carbon_flowrate, 15255.2926526, epsilon = 1e-4);
        let iron_rate = convert_iron_rate(carbon_flowrate / H2SO4_MOL_WEIGHT);
        assert_relative_eq!(iron_rate, 1107.663, epsilon = 1e-3);
        let area = surface_area(36.0, 1000.0);
        assert_relative_eq!(area, 28726723.22, epsilon = 1e-1);
        assert_relative_eq!(corrosion_rate(iron_rate, area), 3.3777366, epsilon = 1e-6);
    }

    #[test]
    fn test_corrosion_rate_acids() {
        let area = surface_area(36.0, 1000.0);
        assert_relative_eq!(corrosion_rate_h2so4(area, 20.0, 3.0), 3.3777366, epsilon = 1e-6);
        assert_relative_eq!(corrosion_rate_hno3(area, 20.0, 4.0), 0.75060813, epsilon = 1e-6);
    }

    #[test]
    fn test_metrics() {
        let pipe = PipeInputs {
            inner_diameter: 36.0,
            drop_out_length: 1000.0,
            flowrate: 20.0,
        };
        let concentrations: ConcentrationVector =
            [("H2SO4", 3.0), ("HNO3", 4.0)].into_iter().collect();
        let h2so4 = CorrosionMetric::H2SO4Corrosion.evaluate(&concentrations, &pipe);
        let hno3 = CorrosionMetric::HNO3Corrosion.evaluate(&concentrations, &pipe);
        assert_relative_eq!(h2so4, 3.3777366, epsilon = 1e-6);
        assert_relative_eq!(
            CorrosionMetric::CorrosionRate.evaluate(&concentrations, &pipe),
            h2so4 + hno3
        );
        assert_eq!(
            CorrosionMetric::from_name("corrosion_rate"),
            Some(CorrosionMetric::CorrosionRate)
        );
        assert_eq!(CorrosionMetric::from_name("H2SO4"), None);
    }

    #[test]
    fn test_pipe_inputs_aliases() {
        let pipe: PipeInputs =
            serde_json::from_str(r#"{"innerDiameter": 36, "dropOutLength": 500}"#).unwrap();
        assert_eq!(pipe.inner_diameter, 36.0);
        assert_eq!(pipe.drop_out_length, 500.0);
        assert_eq!(pipe.flowrate, 20.0);
    }
}
