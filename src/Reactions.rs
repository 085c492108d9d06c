/// Module to calculate the atomic composition and molar mass of a chemical formula and to build
/// the element composition matrix used for the mass balance check of reactions
///
///  # Examples
/// ```
/// use CO2Spec::Reactions::molmass::calculate_molar_mass;
/// let (molar_mass, element_composition) = calculate_molar_mass("H2SO4", None).unwrap();
/// println!("Element counts: {:?}", element_composition);
/// assert!((molar_mass - 98.07).abs() < 0.1);
/// ```
pub mod molmass;
/// error type shared by rules, steps and simulations
pub mod reaction_errors;
/// ConcentrationVector: species -> quantity, absent species read as zero
pub mod concentrations;
/// eng
/// The module takes reaction equations specified as strings and produces reaction rules:
/// reactants and products with their stoichiometric coefficients and a stable index.
/// The order of the rules in a RuleSet is their priority.
/// Equations like "2 NO + O2 -> 2 NO2", "2NO + O2 → 2NO2" and "NO2 + SO2 + H2O -> NO + H2SO4; 1"
/// are accepted (the part after ';' is ignored)
/// # Examples
/// ```
/// use CO2Spec::Reactions::reaction_rules::RuleSet;
/// let rules = RuleSet::from_equations(&[
///     (3, "H2S + 3 NO2 -> SO2 + H2O + 3 NO"),
///     (2, "2 NO + O2 -> 2 NO2"),
/// ]).unwrap();
/// rules.check_element_balance(None).unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
pub mod reaction_rules;
/// applies one rule with the maximal extent allowed by the scarcest reactant
pub mod step_applier;
/// scan - apply - restart loop with a step cap, and the aggregator of produced amounts
pub mod fixpoint;
/// Single run of the rules to a fixpoint
///
///  # Examples
/// ```
/// use CO2Spec::Reactions::concentrations::ConcentrationVector;
/// use CO2Spec::Reactions::fixpoint::SolverSettings;
/// use CO2Spec::Reactions::reaction_rules::RuleSet;
/// use CO2Spec::Reactions::simulator::simulate;
/// let rules = RuleSet::from_equations(&[(0, "2 NO + O2 -> 2 NO2")]).unwrap();
/// let initial: ConcentrationVector = [("NO", 4.0), ("O2", 2.0)].into_iter().collect();
/// let result = simulate(&initial, &rules, &SolverSettings::default()).unwrap();
/// assert_eq!(result.steps.len(), 1);
/// assert_eq!(result.final_state.get("NO2"), 4.0);
/// ```
pub mod simulator;
