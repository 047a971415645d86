pub mod conv_bn_act;
pub mod manager;
pub mod policy_net;
pub mod res_net_block;

// Re-export key components for convenience
pub use conv_bn_act::{Activation, ConvBnAct, ConvBnActConfig};
pub use manager::PolicyModel;
pub use policy_net::{PolicyNet, BOARD_SIZE, INPUT_PLANES, PASS_INDEX, POLICY_SIZE};
pub use res_net_block::{ResidualBlock, ResidualBlockConfig, Shortcut};
