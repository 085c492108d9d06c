use super::reaction_errors::ReactionError;
use log::debug;
use nalgebra::DMatrix;
use std::collections::{BTreeSet, HashMap};

/// chemical groups: name of a group -> its atomic composition, e.g. {"Me": {"C":1, "H":3}}
pub type Groups = HashMap<String, HashMap<String, usize>>;

// element symbols and atomic masses
const ELEMENTS: &[(&str, f64)] = &[
    ("H", 1.008),
    ("He", 4.0026),
    ("Li", 6.94),
    ("Be", 9.0122),
    ("B", 10.81),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("F", 18.998),
    ("Ne", 20.18),
    ("Na", 22.99),
    ("Mg", 24.305),
    ("Al", 26.98),
    ("Si", 28.085),
    ("P", 30.974),
    ("S", 32.065),
    ("Cl", 35.45),
    ("Ar", 39.948),
    ("K", 39.102),
    ("Ca", 40.08),
    ("Ti", 47.867),
    ("Cr", 51.9961),
    ("Mn", 54.938),
    ("Fe", 55.845),
    ("Co", 58.933),
    ("Ni", 58.69),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Br", 79.904),
    ("Hg", 200.59),
    ("Pb", 207.2),
];

fn atomic_mass(symbol: &str) -> Option<f64> {
    ELEMENTS
        .iter()
        .find(|(name, _)| *name == symbol)
        .map(|(_, mass)| *mass)
}

// phase marks like H2O(g) carry no atoms
fn filter_phase_marks(formula: &str) -> &str {
    let phases = ["(g)", "(l)", "(s)", "(c)", "(G)", "(L)", "(S)", "(C)"];
    let mut formula = formula;
    while let Some(stripped) = phases.iter().find_map(|p| formula.strip_suffix(p)) {
        formula = stripped;
    }
    formula
}

fn formula_error(formula: &str, reason: impl Into<String>) -> ReactionError {
    ReactionError::Formula {
        formula: formula.to_string(),
        reason: reason.into(),
    }
}

fn read_count(formula: &str, chars: &[char], i: &mut usize) -> Result<usize, ReactionError> {
    let start = *i;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    if start == *i {
        return Ok(1);
    }
    let digits: String = chars[start..*i].iter().collect();
    digits
        .parse()
        .map_err(|_| formula_error(formula, format!("count {} is too large", digits)))
}

fn add_count(
    formula: &str,
    into: &mut HashMap<String, usize>,
    element: String,
    count: usize,
) -> Result<(), ReactionError> {
    let total = into.entry(element).or_insert(0);
    *total = total
        .checked_add(count)
        .ok_or_else(|| formula_error(formula, "atom count overflows"))?;
    Ok(())
}

fn merge(
    formula: &str,
    into: &mut HashMap<String, usize>,
    from: HashMap<String, usize>,
    times: usize,
) -> Result<(), ReactionError> {
    for (element, count) in from {
        let count = count
            .checked_mul(times)
            .ok_or_else(|| formula_error(formula, "atom count overflows"))?;
        add_count(formula, into, element, count)?;
    }
    Ok(())
}

// Chemical formulae may contain special names for chemical groups, e.g. Me (methyl) which is {"C":1, "H":3}.
// They are turned into regular elements here
fn handle_groups(
    formula: &str,
    counts: HashMap<String, usize>,
    groups: Option<&Groups>,
) -> Result<HashMap<String, usize>, ReactionError> {
    let Some(groups) = groups else {
        return Ok(counts);
    };
    let mut expanded = HashMap::new();
    for (name, number) in counts {
        match groups.get(&name) {
            Some(composition) => merge(formula, &mut expanded, composition.clone(), number)?,
            None => add_count(formula, &mut expanded, name, number)?,
        }
    }
    Ok(expanded)
}

/// Parses a chemical formula and returns the elements and their counts. Brackets with
/// multipliers, e.g. Ca(NO3)2, and trailing phase marks, e.g. H2O(g), are supported.
/// Argument groups is optional: it is needed if the formula contains special names for
/// chemical groups like Me, Ph; it maps the group names to their atomic composition.
pub fn parse_formula(
    formula: &str,
    groups: Option<&Groups>,
) -> Result<HashMap<String, usize>, ReactionError> {
    let cleaned: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    let chars: Vec<char> = filter_phase_marks(&cleaned).chars().collect();
    if chars.is_empty() {
        return Err(formula_error(formula, "empty formula"));
    }
    // every open bracket pushes a new level
    let mut stack: Vec<HashMap<String, usize>> = vec![HashMap::new()];
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '(' {
            stack.push(HashMap::new());
            i += 1;
        } else if c == ')' {
            i += 1;
            let group = stack
                .pop()
                .filter(|_| !stack.is_empty())
                .ok_or_else(|| formula_error(formula, "unbalanced ')'"))?;
            let count = read_count(formula, &chars, &mut i)?;
            let top = stack
                .last_mut()
                .ok_or_else(|| formula_error(formula, "unbalanced ')'"))?;
            merge(formula, top, group, count)?;
        } else if c.is_ascii_uppercase() {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            let symbol: String = chars[start..i].iter().collect();
            let is_group = groups.is_some_and(|g| g.contains_key(&symbol));
            if atomic_mass(&symbol).is_none() && !is_group {
                return Err(formula_error(
                    formula,
                    format!("unknown element '{}'", symbol),
                ));
            }
            let count = read_count(formula, &chars, &mut i)?;
            if let Some(top) = stack.last_mut() {
                add_count(formula, top, symbol, count)?;
            }
        } else {
            return Err(formula_error(
                formula,
                format!("unexpected character '{}' at position {}", c, i),
            ));
        }
    }
    if stack.len() != 1 {
        return Err(formula_error(formula, "unbalanced '('"));
    }
    let counts = stack.pop().unwrap_or_default();
    let counts = handle_groups(formula, counts, groups)?;
    debug!("formula {} parsed into {:?}", formula, counts);
    Ok(counts)
}

/// Calculates the molar mass (g/mol) of a substance given its chemical formula
pub fn calculate_molar_mass(
    formula: &str,
    groups: Option<&Groups>,
) -> Result<(f64, HashMap<String, usize>), ReactionError> {
    let counts = parse_formula(formula, groups)?;
    let mut molar_mass = 0.0;
    for (element, count) in counts.iter() {
        let mass = atomic_mass(element)
            .ok_or_else(|| formula_error(formula, format!("unknown element '{}'", element)))?;
        molar_mass += mass * *count as f64;
    }
    Ok((molar_mass, counts))
}

/// Matrix of elemental composition: one row per formula, one column per element.
/// Elements are returned sorted alphabetically.
pub fn create_elem_composition_matrix(
    vec_of_formulae: &[&str],
    groups: Option<&Groups>,
) -> Result<(DMatrix<f64>, Vec<String>), ReactionError> {
    let mut compositions = Vec::with_capacity(vec_of_formulae.len());
    let mut unique_elements = BTreeSet::new();
    for formula in vec_of_formulae {
        let counts = parse_formula(formula, groups)?;
        unique_elements.extend(counts.keys().cloned());
        compositions.push(counts);
    }
    let elements: Vec<String> = unique_elements.into_iter().collect();
    let mut matrix = DMatrix::zeros(vec_of_formulae.len(), elements.len());
    for (substance_i, counts) in compositions.iter().enumerate() {
        for (j, element) in elements.iter().enumerate() {
            if let Some(count) = counts.get(element) {
                matrix[(substance_i, j)] += *count as f64;
            }
        }
    }
    Ok((matrix, elements))
}

/// H2SO4 -> H₂SO₄
pub fn subscript_formula(formula: &str) -> String {
    formula
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_u32(0x2080 + d).unwrap_or(c),
            None => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formula() {
        let expected_counts = HashMap::from([
            ("C".to_string(), 6),
            ("H".to_string(), 8),
            ("O".to_string(), 6),
        ]);
        assert_eq!(parse_formula("C6H8O6", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("Na".to_string(), 1),
            ("N".to_string(), 2),
            ("O".to_string(), 6),
        ]);
        assert_eq!(parse_formula("Na(NO3)2", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([
            ("H".to_string(), 2),
            ("S".to_string(), 1),
            ("O".to_string(), 4),
        ]);
        assert_eq!(parse_formula("H2SO4", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([("S".to_string(), 8)]);
        assert_eq!(parse_formula("S8", None).unwrap(), expected_counts);

        let expected_counts = HashMap::from([("H".to_string(), 2), ("O".to_string(), 1)]);
        assert_eq!(parse_formula("H2O(g)", None).unwrap(), expected_counts);
    }

    #[test]
    fn test_parse_formula_errors() {
        assert!(parse_formula("", None).is_err());
        assert!(parse_formula("Xx2", None).is_err());
        assert!(parse_formula("Ca(NO3", None).is_err());
        assert!(parse_formula("NO3)2", None).is_err());
        assert!(parse_formula("2NO", None).is_err());
    }

    #[test]
    fn test_overflowing_counts() {
        // more digits than usize holds
        assert!(matches!(
            parse_formula("H99999999999999999999", None),
            Err(ReactionError::Formula { .. })
        ));
        // each count fits, their product does not
        assert!(matches!(
            parse_formula("(H9999999999)9999999999", None),
            Err(ReactionError::Formula { .. })
        ));
        let groups: Groups = HashMap::from([(
            "Me".to_string(),
            HashMap::from([("C".to_string(), 1), ("H".to_string(), 3)]),
        )]);
        assert!(parse_formula("Me9999999999999999999", Some(&groups)).is_err());
        assert!(create_elem_composition_matrix(&["H99999999999999999999", "H"], None).is_err());
        assert_eq!(parse_formula("(H20)30", None).unwrap()["H"], 600);
    }

    #[test]
    fn test_calculate_molar_mass() {
        let (molar_mass, _) = calculate_molar_mass("H2O(g)", None).unwrap();
        assert!((molar_mass - 18.01528).abs() < 1e-2);

        let (molar_mass, _) = calculate_molar_mass("H2SO4", None).unwrap();
        assert!((molar_mass - 98.07).abs() < 1e-1);

        let (molar_mass, _) = calculate_molar_mass("Ca(NO3)2", None).unwrap();
        assert!((molar_mass - 164.093).abs() < 1e-2);
    }

    #[test]
    fn test_with_groups() {
        let groups: Groups = HashMap::from([(
            "Me".to_string(),
            HashMap::from([("C".to_string(), 1), ("H".to_string(), 3)]),
        )]);
        let expected_counts = HashMap::from([("H".to_string(), 8), ("C".to_string(), 7)]);
        assert_eq!(
            parse_formula("C6H5Me", Some(&groups)).unwrap(),
            expected_counts
        );

        let expected_counts = HashMap::from([("H".to_string(), 10), ("C".to_string(), 8)]);
        assert_eq!(
            parse_formula("C6H4(Me)2", Some(&groups)).unwrap(),
            expected_counts
        );
    }

    #[test]
    fn test_element_matrix() {
        let (matrix, elements) =
            create_elem_composition_matrix(&["H2O", "NO2", "HNO3", "S8"], None).unwrap();
        assert_eq!(elements, vec!["H", "N", "O", "S"]);
        assert_eq!(matrix.nrows(), 4);
        assert_eq!(matrix.ncols(), 4);
        // HNO3 row
        assert_eq!(matrix[(2, 0)], 1.0);
        assert_eq!(matrix[(2, 1)], 1.0);
        assert_eq!(matrix[(2, 2)], 3.0);
        assert_eq!(matrix[(3, 3)], 8.0);
    }

    #[test]
    fn test_subscript_formula() {
        assert_eq!(subscript_formula("H2SO4"), "H₂SO₄");
        assert_eq!(subscript_formula("NO"), "NO");
    }
}
