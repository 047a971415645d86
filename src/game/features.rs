use tch::{Device, Kind, Tensor};

use crate::game::board::{Stone, SIZE};
use crate::game::io::GameInput;
use crate::neural::{BOARD_SIZE, INPUT_PLANES};

/// Network input planes for the side to move, shape `[5, 5, 5]`.
///
/// Planes: black stones, white stones, black group liberties, white group
/// liberties, and the side-to-move sign (+1 black, -1 white) on every empty point.
pub fn encode_planes(input: &GameInput) -> Tensor {
    let board = &input.current;
    let sign = if input.piece == Stone::White { -1.0 } else { 1.0 };
    let mut planes = [[[0f32; SIZE]; SIZE]; INPUT_PLANES as usize];

    for row in 0..SIZE {
        for col in 0..SIZE {
            match board.get(row, col) {
                Stone::Black => {
                    planes[0][row][col] = 1.0;
                    planes[2][row][col] = board.liberties(row, col) as f32;
                }
                Stone::White => {
                    planes[1][row][col] = 1.0;
                    planes[3][row][col] = board.liberties(row, col) as f32;
                }
                Stone::Empty => planes[4][row][col] = sign,
            }
        }
    }

    let flat: Vec<f32> = planes.iter().flatten().flatten().copied().collect();
    Tensor::from_slice(&flat).view([INPUT_PLANES, BOARD_SIZE, BOARD_SIZE])
}

/// Stacks several positions into a `[N, 5, 5, 5]` batch on `device`
pub fn encode_batch(inputs: &[GameInput], device: Device) -> Tensor {
    if inputs.is_empty() {
        return Tensor::zeros([0, INPUT_PLANES, BOARD_SIZE, BOARD_SIZE], (Kind::Float, device));
    }
    let planes: Vec<Tensor> = inputs.iter().map(encode_planes).collect();
    Tensor::stack(&planes, 0).to_device(device)
}
