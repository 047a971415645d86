//! Referee file round trip through the greedy engine

use std::fs;

use go_policy_net::{
    engine::{GreedyPolicyEngine, MoveEngine},
    game::{read_input, write_output, Move, Stone},
    neural::PolicyModel,
    Error,
};
use tch::Device;

const INPUT: &str = "1\n00000\n00000\n00200\n00000\n00000\n00000\n00100\n00200\n00000\n00000\n";

#[test]
fn test_read_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.txt");
    fs::write(&path, INPUT).unwrap();

    let input = read_input(&path).unwrap();
    assert_eq!(input.piece, Stone::Black);
    assert_eq!(input.previous.get(2, 2), Stone::White);
    assert_eq!(input.current.get(1, 2), Stone::Black);
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(read_input(dir.path().join("absent.txt")), Err(Error::Io(_))));
}

#[test]
fn test_write_output_formats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.txt");

    write_output(&path, &Move::Place { row: 3, col: 0 }).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "3,0");

    write_output(&path, &Move::Pass).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "PASS");
}

#[test]
fn test_player_turn_with_saved_weights() {
    let dir = tempfile::tempdir().unwrap();
    let weights = dir.path().join("policy.ot");
    PolicyModel::seeded(Device::Cpu, 5).unwrap().save(&weights).unwrap();
    let input_path = dir.path().join("input.txt");
    let output_path = dir.path().join("output.txt");
    fs::write(&input_path, INPUT).unwrap();

    let input = read_input(&input_path).unwrap();
    let engine = GreedyPolicyEngine::new(PolicyModel::load(Device::Cpu, &weights).unwrap());
    let mv = engine.select_move(&input).unwrap();
    write_output(&output_path, &mv).unwrap();

    let written = fs::read_to_string(&output_path).unwrap();
    match mv {
        Move::Pass => assert_eq!(written, "PASS"),
        Move::Place { row, col } => {
            assert_eq!(written, format!("{row},{col}"));
            assert_eq!(input.current.get(row, col), Stone::Empty);
        }
    }
}
