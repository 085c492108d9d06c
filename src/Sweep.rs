/// Corrosion rates derived from the final concentrations of the acids
///
///  # Examples
/// ```
/// use CO2Spec::Sweep::corrosion_metrics::{corrosion_rate_h2so4, surface_area};
/// let area = surface_area(36.0, 1000.0);
/// let rate = corrosion_rate_h2so4(area, 20.0, 3.0);
/// assert!((rate - 3.3777366).abs() < 1e-6);
/// ```
pub mod corrosion_metrics;
/// axis ranges of the sweep and the heatmap grid
pub mod grid;
/// eng
/// Two-dimensional parameter sweep: two species of the initial vector are varied over their own
/// axis ranges, the rules are run to a fixpoint for every cell (cells are computed in parallel
/// with rayon), and the final amount of a chosen species, or a corrosion metric computed from the
/// final vector, becomes the value of the heatmap cell. The full result of every cell is kept.
pub mod sweep_orchestrator;

mod sweep_tests;
