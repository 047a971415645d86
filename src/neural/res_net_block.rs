use tch::{nn, Tensor};

use crate::neural::conv_bn_act::{batch_norm, expect_channels, ConvBnAct, ConvBnActConfig};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidualBlockConfig {
    pub kernel_size: i64,
    pub stride: i64,
    pub padding: i64,
}

impl Default for ResidualBlockConfig {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            stride: 1,
            padding: 1,
        }
    }
}

/// Skip connection, fixed once at construction
#[derive(Debug)]
pub enum Shortcut {
    Identity,
    /// 1×1 projection → max-pool (block kernel/stride/padding) → BatchNorm
    Projection {
        conv: nn::Conv2D,
        bn: nn::BatchNorm,
        pool: ResidualBlockConfig,
    },
}

/// Residual Block: two ConvBnAct units plus an identity or projected shortcut
#[derive(Debug)]
pub struct ResidualBlock {
    conv1: ConvBnAct,
    conv2: ConvBnAct,
    shortcut: Shortcut,
    config: ResidualBlockConfig,
}

impl ResidualBlock {
    pub fn new(
        path: &nn::Path,
        channels_in: i64,
        channels_out: i64,
        config: ResidualBlockConfig,
    ) -> Result<Self> {
        // Both paths share the first unit's output size; the second unit and
        // the pooled shortcut only agree when padding keeps the size ("same").
        if config.kernel_size <= 0 || 2 * config.padding != config.kernel_size - 1 {
            return Err(Error::InvalidConfig(format!(
                "residual paths diverge for kernel {} with padding {}",
                config.kernel_size, config.padding
            )));
        }

        let conv1 = ConvBnAct::new(
            &(path / "conv1"),
            channels_in,
            channels_out,
            ConvBnActConfig {
                kernel_size: config.kernel_size,
                stride: config.stride,
                padding: config.padding,
                ..Default::default()
            },
        )?;
        let conv2 = ConvBnAct::new(
            &(path / "conv2"),
            channels_out,
            channels_out,
            ConvBnActConfig {
                kernel_size: config.kernel_size,
                stride: 1,
                padding: config.padding,
                activation: None,
                ..Default::default()
            },
        )?;

        let shortcut = if config.stride == 1 && channels_in == channels_out {
            Shortcut::Identity
        } else {
            let shortcut_path = path / "shortcut";
            Shortcut::Projection {
                conv: nn::conv2d(
                    &shortcut_path / "conv",
                    channels_in,
                    channels_out,
                    1,
                    nn::ConvConfig {
                        bias: false,
                        ..Default::default()
                    },
                ),
                bn: batch_norm(&(&shortcut_path / "bn"), channels_out),
                pool: config,
            }
        };

        Ok(Self {
            conv1,
            conv2,
            shortcut,
            config,
        })
    }

    pub fn has_identity_shortcut(&self) -> bool {
        matches!(self.shortcut, Shortcut::Identity)
    }

    pub fn in_channels(&self) -> i64 {
        self.conv1.in_channels()
    }

    pub fn out_channels(&self) -> i64 {
        self.conv2.out_channels()
    }

    pub fn config(&self) -> &ResidualBlockConfig {
        &self.config
    }

    /// Silence the main path: the block then reduces to `relu(shortcut(x))`.
    pub fn zero_residual_scale(&mut self) {
        self.conv2.zero_norm_affine();
    }

    pub fn forward_checked(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        expect_channels("ResidualBlock", x, self.in_channels())?;
        // Both later stages keep conv1's output size
        self.conv1.expect_spatial("ResidualBlock", x)?;
        Ok(self.forward_unchecked(x, train))
    }

    pub(crate) fn forward_unchecked(&self, x: &Tensor, train: bool) -> Tensor {
        let out = self
            .conv2
            .forward_unchecked(&self.conv1.forward_unchecked(x, train), train);

        let identity = match &self.shortcut {
            Shortcut::Identity => x.shallow_clone(),
            Shortcut::Projection { conv, bn, pool } => x
                .apply(conv)
                .max_pool2d(
                    [pool.kernel_size, pool.kernel_size],
                    [pool.stride, pool.stride],
                    [pool.padding, pool.padding],
                    [1, 1],
                    false,
                )
                .apply_t(bn, train),
        };

        assert_eq!(
            out.size(),
            identity.size(),
            "residual main path and shortcut disagree on output shape"
        );

        // Add skip connection and activate
        (out + identity).relu()
    }
}

impl nn::ModuleT for ResidualBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self.forward_checked(xs, train) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }
}
