use std::fs;
use std::path::PathBuf;

use qmc_trace::{step_window, AnalysisError, StateSeries, Trace, TraceData};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("qmc_trace_test_{name}"));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_normal_trace() {
    let path = temp_file(
        "normal.txt",
        "# i, Nw, S, E, J2, norm\n\
         100, 0, 1000, -7.5, -15.0, 3.0, 2.0\n\
         200, 0, 1010, -7.4, -14.8, 3.1, 2.0\n\
         300, 0, 1020, -7.6, -15.2, 2.9, 2.0\n",
    );
    let trace = Trace::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert!(!trace.is_replica());
    assert_eq!(trace.steps(), &[100, 200, 300]);
    assert_eq!(trace.stride().unwrap(), 100);
    assert_eq!(trace.num_states(), 1);

    let series = trace.normal_state(0).unwrap();
    assert_eq!(series.walkers, vec![1000.0, 1010.0, 1020.0]);
    assert_eq!(series.shift, vec![-7.5, -7.4, -7.6]);
    assert_eq!(series.norm, vec![2.0, 2.0, 2.0]);

    let energy = trace.normalized_energy(0).unwrap();
    assert!((energy[0] - (-7.5)).abs() < 1e-12);
}

#[test]
fn test_load_replica_trace() {
    let path = temp_file(
        "replica.txt",
        "# i, replica_E, replica_J2, norm\n\
         100, 0, -30.0, 6.0, 4.0\n\
         200, 0, -29.0, 6.2, 4.1\n",
    );
    let trace = Trace::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert!(trace.is_replica());
    match trace.data() {
        TraceData::Replica(states) => {
            assert_eq!(states.len(), 1);
            assert_eq!(states[0].energy, vec![-30.0, -29.0]);
        }
        TraceData::Normal(_) => panic!("header sniffing picked the wrong shape"),
    }

    // Replica traces carry no shift data.
    assert!(trace.normal_state(0).is_err());
    // But the (E, J2, norm) triple is still there.
    let (energy, j2, norm) = trace.observable_state(0).unwrap();
    assert_eq!(energy.len(), 2);
    assert_eq!(j2[1], 6.2);
    assert_eq!(norm[0], 4.0);
}

#[test]
fn test_load_groups_multiple_states() {
    let path = temp_file(
        "two_states.txt",
        "# i, Nw, S, E, J2, norm\n\
         100, 0, 1000, -7.5, -15.0, 3.0, 2.0\n\
         100, 1, 500, -3.5, -7.0, 1.0, 1.0\n\
         200, 0, 1010, -7.4, -14.8, 3.1, 2.0\n\
         200, 1, 510, -3.4, -6.8, 1.1, 1.0\n",
    );
    let trace = Trace::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(trace.num_states(), 2);
    assert_eq!(trace.steps(), &[100, 200]);
    assert_eq!(trace.normal_state(0).unwrap().walkers, vec![1000.0, 1010.0]);
    assert_eq!(trace.normal_state(1).unwrap().walkers, vec![500.0, 510.0]);
}

#[test]
fn test_load_rejects_missing_header() {
    let path = temp_file("headerless.txt", "100, 0, 1000, -7.5, -15.0, 3.0, 2.0\n");
    let result = Trace::from_path(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(AnalysisError::MalformedTrace(_))));
}

#[test]
fn test_load_rejects_wrong_column_count() {
    let path = temp_file(
        "short_row.txt",
        "# i, Nw, S, E, J2, norm\n100, 0, 1000, -7.5\n",
    );
    let result = Trace::from_path(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(AnalysisError::MalformedTrace(_))));
}

#[test]
fn test_load_rejects_non_numeric_field() {
    let path = temp_file(
        "bad_field.txt",
        "# i, Nw, S, E, J2, norm\n100, 0, 1000, oops, -15.0, 3.0, 2.0\n",
    );
    let result = Trace::from_path(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(AnalysisError::MalformedTrace(_))));
}

#[test]
fn test_construction_rejects_misaligned_state() {
    let steps = vec![100i64, 200, 300];
    let series = StateSeries {
        walkers: vec![1.0; 3],
        shift: vec![1.0; 2], // one sample short
        energy: vec![1.0; 3],
        j2: vec![1.0; 3],
        norm: vec![1.0; 3],
    };
    assert!(matches!(
        Trace::normal(steps, vec![series]),
        Err(AnalysisError::AlignmentMismatch(_))
    ));
}

#[test]
fn test_construction_rejects_unsorted_steps() {
    let steps = vec![100i64, 300, 200];
    let series = StateSeries {
        walkers: vec![1.0; 3],
        shift: vec![1.0; 3],
        energy: vec![1.0; 3],
        j2: vec![1.0; 3],
        norm: vec![1.0; 3],
    };
    assert!(matches!(
        Trace::normal(steps, vec![series]),
        Err(AnalysisError::InvalidParameter { .. })
    ));
}

#[test]
fn test_step_window_selects_inclusive_range() {
    let steps = [100i64, 200, 300, 400, 500];
    assert_eq!(step_window(&steps, None, None).unwrap(), 0..5);
    assert_eq!(step_window(&steps, Some(200), Some(400)).unwrap(), 1..4);
    assert_eq!(step_window(&steps, Some(300), None).unwrap(), 2..5);
    assert_eq!(step_window(&steps, None, Some(300)).unwrap(), 0..3);
}

#[test]
fn test_step_window_requires_exact_steps() {
    let steps = [100i64, 200, 300];
    assert!(matches!(
        step_window(&steps, Some(150), None),
        Err(AnalysisError::LookupFailure { step: 150 })
    ));
    assert!(matches!(
        step_window(&steps, None, Some(350)),
        Err(AnalysisError::LookupFailure { step: 350 })
    ));
}
