//! Spread-rate models: the physical plug point of the engine.
//!
//! A model sees only a [`SpreadSample`] (layer values at one front marker)
//! and returns a scalar rate along the marker's outward normal, so alternate
//! physics can be substituted without touching the front or the simulator.
//!
//! `RothermelSpread` follows Rothermel (1972), "A mathematical model for
//! predicting fire spread in wildland fuels", USDA Forest Service Research
//! Paper INT-115; the two idealized models exist for analytic scenarios and
//! regression tests.

use crate::core_types::Vec2;
use serde::{Deserialize, Serialize};

/// Environmental values gathered at one marker before rate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadSample {
    /// Horizontal wind vector (m/s)
    pub wind: Vec2,
    /// Outward front normal at the marker (unit)
    pub normal: Vec2,
    /// Fuel type code from the index layer
    pub fuel: i32,
    /// Fuel moisture content (fraction)
    pub moisture: f64,
    /// Terrain slope along the normal (degrees)
    pub slope: f64,
}

/// Capability set {samples-in, rate-out}. Implementations must be thread-safe:
/// rate evaluation is fanned out over markers with rayon.
pub trait SpreadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Spread rate (m/s) along the outward normal. Never negative.
    fn rate(&self, sample: &SpreadSample) -> f64;
}

/// Constant rate everywhere. Used by idealized scenarios where the analytic
/// solution is a uniformly expanding circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformSpread {
    pub rate: f64,
}

impl Default for UniformSpread {
    fn default() -> Self {
        Self { rate: 0.5 }
    }
}

impl SpreadModel for UniformSpread {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn rate(&self, _sample: &SpreadSample) -> f64 {
        self.rate.max(0.0)
    }
}

/// Base rate plus a head-fire boost proportional to the wind component along
/// the outward normal. Flanks see the base rate, the back of the fire is
/// never pushed below zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindDrivenSpread {
    /// Windless spread rate (m/s)
    pub base: f64,
    /// Dimensionless gain on the along-normal wind component
    pub wind_factor: f64,
}

impl Default for WindDrivenSpread {
    fn default() -> Self {
        Self {
            base: 0.2,
            wind_factor: 0.15,
        }
    }
}

impl SpreadModel for WindDrivenSpread {
    fn name(&self) -> &'static str {
        "windDriven"
    }

    fn rate(&self, sample: &SpreadSample) -> f64 {
        let along = sample.wind.dot(&sample.normal).max(0.0);
        (self.base + self.wind_factor * along).max(0.0)
    }
}

/// Surface fuel bed properties for the Rothermel model, keyed by the fuel
/// index layer's code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelProperties {
    /// Surface-area-to-volume ratio (1/m)
    pub sav_ratio: f64,
    /// Fuel bed bulk density (kg/m³)
    pub bulk_density: f64,
    /// Fuel particle density (kg/m³)
    pub particle_density: f64,
    /// Fuel bed depth (m)
    pub bed_depth: f64,
    /// Heat content (kJ/kg)
    pub heat_content: f64,
    /// Moisture content above which the fuel will not carry fire (fraction)
    pub moisture_of_extinction: f64,
    /// Mineral damping coefficient
    pub mineral_damping: f64,
    /// Effective heating number
    pub effective_heating: f64,
}

impl FuelProperties {
    /// Cured grassland fuel.
    pub fn grass() -> Self {
        Self {
            sav_ratio: 3500.0,
            bulk_density: 1.2,
            particle_density: 512.0,
            bed_depth: 0.3,
            heat_content: 18_600.0,
            moisture_of_extinction: 0.25,
            mineral_damping: 0.42,
            effective_heating: 0.4,
        }
    }

    /// Dry sclerophyll shrub fuel.
    pub fn shrub() -> Self {
        Self {
            sav_ratio: 2000.0,
            bulk_density: 2.0,
            particle_density: 512.0,
            bed_depth: 0.6,
            heat_content: 20_000.0,
            moisture_of_extinction: 0.30,
            mineral_damping: 0.42,
            effective_heating: 0.35,
        }
    }

    /// Forest litter fuel.
    pub fn litter() -> Self {
        Self {
            sav_ratio: 1800.0,
            bulk_density: 3.0,
            particle_density: 512.0,
            bed_depth: 0.1,
            heat_content: 19_000.0,
            moisture_of_extinction: 0.30,
            mineral_damping: 0.42,
            effective_heating: 0.35,
        }
    }
}

/// Rothermel (1972) surface spread, driven by the fuel index layer.
///
/// Codes out of table range fall back to entry 0; an empty table never
/// spreads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RothermelSpread {
    pub fuels: Vec<FuelProperties>,
}

impl Default for RothermelSpread {
    fn default() -> Self {
        Self {
            fuels: vec![
                FuelProperties::grass(),
                FuelProperties::shrub(),
                FuelProperties::litter(),
            ],
        }
    }
}

impl RothermelSpread {
    fn fuel_for(&self, code: i32) -> Option<&FuelProperties> {
        if self.fuels.is_empty() {
            return None;
        }
        let idx = usize::try_from(code).unwrap_or(0);
        Some(self.fuels.get(idx).unwrap_or(&self.fuels[0]))
    }
}

impl SpreadModel for RothermelSpread {
    fn name(&self) -> &'static str {
        "Rothermel"
    }

    fn rate(&self, sample: &SpreadSample) -> f64 {
        let Some(fuel) = self.fuel_for(sample.fuel) else {
            return 0.0;
        };
        let wind_along = sample.wind.dot(&sample.normal).max(0.0);
        rothermel_spread_rate(fuel, sample.moisture, wind_along, sample.slope)
    }
}

/// Rothermel rate of spread in m/s.
///
/// ```text
/// R = I_R × ξ × (1 + Φ_w + Φ_s) / (ρ_b × ε × Q_ig)
/// ```
pub fn rothermel_spread_rate(
    fuel: &FuelProperties,
    moisture_fraction: f64,
    wind_speed_ms: f64,
    slope_angle_deg: f64,
) -> f64 {
    // A fuel bed wetter than its extinction moisture will not carry fire
    if moisture_fraction >= fuel.moisture_of_extinction {
        return 0.0;
    }

    let reaction_intensity = reaction_intensity(fuel, moisture_fraction);
    let propagating_flux = propagating_flux(fuel);
    let wind_coefficient = wind_coefficient(fuel, wind_speed_ms);
    let slope_coefficient = slope_coefficient(slope_angle_deg);
    let heat_preignition = heat_of_preignition(moisture_fraction);

    let rate_m_per_min = (reaction_intensity
        * propagating_flux
        * (1.0 + wind_coefficient + slope_coefficient))
        / (fuel.bulk_density * fuel.effective_heating * heat_preignition);

    (rate_m_per_min / 60.0).max(0.0)
}

/// Reaction intensity I_R = Γ' × w_n × h × η_M × η_s (kJ/(m²·min)).
fn reaction_intensity(fuel: &FuelProperties, moisture_fraction: f64) -> f64 {
    // Optimum reaction velocity Γ'_max = σ^1.5 / (495 + 0.0594 σ^1.5)
    let sigma_15 = fuel.sav_ratio.powf(1.5);
    let gamma_max = sigma_15 / (495.0 + 0.0594 * sigma_15);

    let beta = (fuel.bulk_density / fuel.particle_density).min(1.0);
    let fuel_loading = fuel.bulk_density * fuel.bed_depth;
    let eta_m = moisture_damping(moisture_fraction, fuel.moisture_of_extinction);

    gamma_max * beta * fuel_loading * fuel.heat_content * eta_m * fuel.mineral_damping
}

/// η_M = 1 - 2.59 r + 5.11 r² - 3.52 r³ with r = M_f / M_x.
fn moisture_damping(moisture_fraction: f64, moisture_extinction: f64) -> f64 {
    if moisture_extinction <= 0.0 {
        return 1.0;
    }
    let r = (moisture_fraction / moisture_extinction).min(1.0);
    (1.0 - 2.59 * r + 5.11 * r.powi(2) - 3.52 * r.powi(3)).clamp(0.0, 1.0)
}

/// ξ = exp((0.792 + 0.681 σ^0.5)(β + 0.1)) / (192 + 0.2595 σ).
fn propagating_flux(fuel: &FuelProperties) -> f64 {
    let sigma = fuel.sav_ratio;
    let beta = (fuel.bulk_density / fuel.particle_density).min(1.0);
    let numerator = ((0.792 + 0.681 * sigma.sqrt()) * (beta + 0.1)).exp();
    (numerator / (192.0 + 0.2595 * sigma)).clamp(0.0, 1.0)
}

/// Φ_w = C × U^B, wind speed in m/min at midflame height.
fn wind_coefficient(fuel: &FuelProperties, wind_speed_ms: f64) -> f64 {
    if wind_speed_ms < 0.1 {
        return 0.0;
    }
    let sigma = fuel.sav_ratio;
    let c = 7.47 * (-0.133 * sigma.powf(0.55)).exp();
    let b = 0.02526 * sigma.powf(0.54);
    c * (wind_speed_ms * 60.0).powf(b)
}

/// Φ_s = 5.275 × tan²(θ), upslope only.
fn slope_coefficient(slope_angle_deg: f64) -> f64 {
    if slope_angle_deg <= 0.0 {
        return 0.0;
    }
    let tan_slope = slope_angle_deg.to_radians().tan();
    5.275 * tan_slope.powi(2)
}

/// Q_ig = 581 + 2594 × M_f (kJ/kg).
fn heat_of_preignition(moisture_fraction: f64) -> f64 {
    581.0 + 2594.0 * moisture_fraction
}

/// Resolve a model by the `propagationModel` parameter value.
///
/// Unknown names fall back to the uniform model so idealized scenario scripts
/// keep running.
pub fn spread_model_by_name(name: &str) -> Box<dyn SpreadModel> {
    match name {
        "Rothermel" => Box::new(RothermelSpread::default()),
        "windDriven" => Box::new(WindDrivenSpread::default()),
        _ => Box::new(UniformSpread::default()),
    }
}
