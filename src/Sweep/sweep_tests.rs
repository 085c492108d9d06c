#[cfg(test)]
mod tests {
    use crate::Reactions::concentrations::ConcentrationVector;
    use crate::Reactions::fixpoint::SolverSettings;
    use crate::Reactions::reaction_rules::RuleSet;
    use crate::Sweep::corrosion_metrics::{CorrosionMetric, PipeInputs};
    use crate::Sweep::grid::{AxisRange, Grid};
    use crate::Sweep::sweep_orchestrator::{
        CancellationToken, CellOutcome, SweepError, SweepRequest, SweepResult, SweepSettings,
        run_sweep,
    };
    use approx::assert_relative_eq;
    use std::thread;
    use std::time::Duration;

    fn rules() -> RuleSet {
        RuleSet::from_equations(&[
            (3, "H2S + 3 NO2 -> SO2 + H2O + 3 NO"),
            (2, "2 NO + O2 -> 2 NO2"),
            (1, "NO2 + SO2 + H2O -> NO + H2SO4"),
            (4, "3 NO2 + H2O -> 2 HNO3 + NO"),
            (6, "8 H2S + 4 O2 -> 8 H2O + S8"),
        ])
        .unwrap()
    }

    fn baseline() -> ConcentrationVector {
        [
            ("H2O", 30.0),
            ("O2", 30.0),
            ("SO2", 10.0),
            ("NO2", 20.0),
            ("H2S", 0.0),
        ]
        .into_iter()
        .collect()
    }

    fn request(value: &str) -> SweepRequest {
        SweepRequest {
            baseline: baseline(),
            row: "NO2".to_string(),
            column: "O2".to_string(),
            value: value.to_string(),
            x_axis: AxisRange::Values(vec![0.5, 1.0, 2.0, 4.0]),
            y_axis: AxisRange::Range {
                start: 1.0,
                stop: 4.0,
                step: 1.0,
            },
            pipe: PipeInputs::default(),
        }
    }

    #[test]
    fn test_axis_values() {
        let values = AxisRange::default().values().unwrap();
        assert_eq!(values.len(), 20);
        assert_eq!(values[0], 0.5);
        assert_eq!(values[19], 10.0);
        let values = AxisRange::Range {
            start: 0.0,
            stop: 1.0,
            step: 0.25,
        }
        .values()
        .unwrap();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);

        assert!(AxisRange::Values(vec![]).values().is_err());
        assert!(AxisRange::Values(vec![1.0, 0.5]).values().is_err());
        assert!(AxisRange::Values(vec![-1.0, 0.5]).values().is_err());
        assert!(
            AxisRange::Range {
                start: 0.0,
                stop: 1.0,
                step: 0.0
            }
            .values()
            .is_err()
        );
    }

    #[test]
    fn test_axis_range_json() {
        let range: AxisRange =
            serde_json::from_str(r#"{"start": 0.5, "stop": 2.0, "step": 0.5}"#).unwrap();
        assert_eq!(range.values().unwrap(), vec![0.5, 1.0, 1.5]);
        let explicit: AxisRange = serde_json::from_str("[1, 2, 5]").unwrap();
        assert_eq!(explicit, AxisRange::Values(vec![1.0, 2.0, 5.0]));
    }

    #[test]
    fn test_sweep_shape() {
        let rules = rules();
        let result = run_sweep(
            &request("H2SO4"),
            &rules,
            &SweepSettings::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let grid = &result.plot;
        assert_eq!(grid.x, vec![0.5, 1.0, 2.0, 4.0]);
        assert_eq!(grid.y, vec![1.0, 2.0, 3.0]);
        assert_eq!(grid.shape(), (3, 4));
        assert_eq!(grid.z.len(), 3);
        assert_eq!(result.result_data.len(), 3);
        for i in 0..3 {
            assert_eq!(grid.z[i].len(), 4);
            assert_eq!(result.result_data[i].len(), 4);
            for j in 0..4 {
                let cell = result.result_data[i][j].result().unwrap();
                assert_eq!(cell.initial.get("NO2"), grid.y[i]);
                assert_eq!(cell.initial.get("O2"), grid.x[j]);
                // untouched baseline species
                assert_eq!(cell.initial.get("H2O"), 30.0);
                assert_eq!(grid.z[i][j], cell.final_state.get("H2SO4"));
            }
        }
        assert_eq!(result.failed_cells(), 0);
    }

    #[test]
    fn test_sweep_metric_value() {
        let rules = rules();
        let mut req = request("corrosion_rate");
        req.pipe = PipeInputs {
            inner_diameter: 36.0,
            drop_out_length: 1000.0,
            flowrate: 20.0,
        };
        let result = run_sweep(
            &req,
            &rules,
            &SweepSettings::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let cell = result.result_data[2][3].result().unwrap();
        let expected = CorrosionMetric::CorrosionRate.evaluate(&cell.final_state, &req.pipe);
        assert_relative_eq!(result.plot.z[2][3], expected);
        assert!(expected > 0.0);
    }

    #[test]
    fn test_unknown_selectors_fail_fast() {
        let rules = rules();
        let settings = SweepSettings::default();
        let token = CancellationToken::new();

        let mut req = request("H2SO4");
        req.row = "CO".to_string();
        match run_sweep(&req, &rules, &settings, &token) {
            Err(SweepError::UnknownSelector { role, name }) => {
                assert_eq!(role, "row");
                assert_eq!(name, "CO");
            }
            other => panic!("expected UnknownSelector, got {:?}", other),
        }

        let req = request("rust_rate");
        assert!(matches!(
            run_sweep(&req, &rules, &settings, &token),
            Err(SweepError::UnknownSelector { role: "value", .. })
        ));

        let mut req = request("H2SO4");
        req.column = "NO2".to_string();
        assert!(matches!(
            run_sweep(&req, &rules, &settings, &token),
            Err(SweepError::DegenerateAxes(_))
        ));

        let mut req = request("H2SO4");
        req.baseline.set("H2O", -3.0);
        assert!(matches!(
            run_sweep(&req, &rules, &settings, &token),
            Err(SweepError::Simulation(_))
        ));
    }

    #[test]
    fn test_failed_cells_do_not_abort_the_sweep() {
        // O2 and O turn into each other forever
        let rules = RuleSet::from_equations(&[(1, "O2 -> 2 O"), (2, "2 O -> O2")]).unwrap();
        let req = SweepRequest {
            baseline: [("N2", 1.0)].into_iter().collect(),
            row: "O2".to_string(),
            column: "N2".to_string(),
            value: "O2".to_string(),
            x_axis: AxisRange::Values(vec![0.0, 1.0]),
            y_axis: AxisRange::Values(vec![0.0, 1.0]),
            pipe: PipeInputs::default(),
        };
        let settings = SweepSettings {
            solver: SolverSettings {
                max_steps: 20,
                ..SolverSettings::default()
            },
            ..SweepSettings::default()
        };
        let result = run_sweep(&req, &rules, &settings, &CancellationToken::new()).unwrap();
        assert_eq!(result.plot.z[0], vec![0.0, 0.0]);
        assert!(result.plot.z[1].iter().all(|v| v.is_nan()));
        assert_eq!(result.failed_cells(), 2);
        assert!(matches!(
            &result.result_data[1][0],
            CellOutcome::Failed { error } if error.contains("20 steps")
        ));
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["plot"]["z"][1][0].is_null());
        assert!(json["resultData"][1][1]["error"].is_string());
        assert!(json["resultData"][0][0]["final"].is_object());

        // failed cells read back as NaN
        let text = serde_json::to_string(&result).unwrap();
        let restored: SweepResult = serde_json::from_str(&text).unwrap();
        assert_eq!(restored.plot.z[0], vec![0.0, 0.0]);
        assert!(restored.plot.z[1].iter().all(|v| v.is_nan()));
        assert_eq!(restored.failed_cells(), 2);
        assert_eq!(restored.result_data[0][1], result.result_data[0][1]);
    }

    #[test]
    fn test_grid_null_cells() {
        let grid: Grid =
            serde_json::from_str(r#"{"x": [1, 2], "y": [3], "z": [[0.5, null]]}"#).unwrap();
        assert_eq!(grid.z[0][0], 0.5);
        assert!(grid.z[0][1].is_nan());
        assert_eq!(grid.to_csv("NO2", "O2").lines().nth(1), Some("3,0.5,"));
    }

    #[test]
    fn test_huge_axis_is_rejected() {
        let huge = AxisRange::Range {
            start: 0.0,
            stop: 1e30,
            step: 1.0,
        };
        assert!(matches!(huge.values(), Err(SweepError::InvalidAxis(_))));
        let huge: AxisRange =
            serde_json::from_str(r#"{"start": 0, "stop": 1e30, "step": 1}"#).unwrap();
        let mut req = request("H2SO4");
        req.x_axis = huge;
        req.y_axis = AxisRange::Values(vec![1.0]);
        assert!(matches!(
            run_sweep(&req, &rules(), &SweepSettings::default(), &CancellationToken::new()),
            Err(SweepError::InvalidAxis(_))
        ));
    }

    #[test]
    fn test_cell_limit() {
        let settings = SweepSettings {
            max_cells: 10,
            ..SweepSettings::default()
        };
        // 3 x 4 cells, each axis alone is within the limit
        assert!(matches!(
            run_sweep(&request("H2SO4"), &rules(), &settings, &CancellationToken::new()),
            Err(SweepError::InvalidAxis(_))
        ));
        let settings = SweepSettings {
            max_cells: 12,
            ..SweepSettings::default()
        };
        let result =
            run_sweep(&request("H2SO4"), &rules(), &settings, &CancellationToken::new()).unwrap();
        assert_eq!(result.plot.shape(), (3, 4));
        assert!(matches!(
            AxisRange::Values(vec![1.0, 2.0, 3.0]).values_within(2),
            Err(SweepError::InvalidAxis(_))
        ));
    }

    #[test]
    fn test_dedicated_pool_gives_same_result() {
        let rules = rules();
        let token = CancellationToken::new();
        let global = run_sweep(&request("HNO3"), &rules, &SweepSettings::default(), &token).unwrap();
        let pooled = run_sweep(
            &request("HNO3"),
            &rules,
            &SweepSettings {
                threads: Some(2),
                ..SweepSettings::default()
            },
            &token,
        )
        .unwrap();
        assert_eq!(global, pooled);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            run_sweep(&request("H2SO4"), &rules(), &SweepSettings::default(), &token),
            Err(SweepError::Cancelled)
        ));
    }

    #[test]
    fn test_cancelled_mid_flight() {
        // every cell runs into the step cap, so the sweep takes long enough to be cancelled
        let rules = RuleSet::from_equations(&[(1, "O2 -> 2 O"), (2, "2 O -> O2")]).unwrap();
        let req = SweepRequest {
            baseline: [("N2", 1.0)].into_iter().collect(),
            row: "O2".to_string(),
            column: "N2".to_string(),
            value: "O2".to_string(),
            x_axis: AxisRange::Range {
                start: 1.0,
                stop: 61.0,
                step: 1.0,
            },
            y_axis: AxisRange::Range {
                start: 1.0,
                stop: 61.0,
                step: 1.0,
            },
            pipe: PipeInputs::default(),
        };
        let settings = SweepSettings {
            solver: SolverSettings {
                max_steps: 10_000,
                ..SolverSettings::default()
            },
            threads: Some(2),
            ..SweepSettings::default()
        };
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                token.cancel();
            })
        };
        let result = run_sweep(&req, &rules, &settings, &token);
        canceller.join().unwrap();
        assert!(matches!(result, Err(SweepError::Cancelled)));
    }

    #[test]
    fn test_csv_export() {
        let rules = rules();
        let result = run_sweep(
            &request("H2SO4"),
            &rules,
            &SweepSettings::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let csv = result.plot.to_csv("NO2", "O2");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "NO2\\O2,0.5,1,2,4");
        assert!(lines[1].starts_with("1,"));
        assert_eq!(lines[3].split(',').count(), 5);
    }
}
