//! Convolution → BatchNorm → optional activation, the atomic unit of the tower.

use tch::{nn, Tensor};

use crate::{Error, Result};

/// Nonlinearity applied after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    LeakyRelu,
}

impl Activation {
    pub fn apply(self, xs: &Tensor) -> Tensor {
        match self {
            Activation::Relu => xs.relu(),
            Activation::LeakyRelu => xs.leaky_relu(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvBnActConfig {
    pub kernel_size: i64,
    pub stride: i64,
    pub padding: i64,
    pub dilation: i64,
    pub groups: i64,
    pub bias: bool,
    /// `None` leaves the normalized output as is
    pub activation: Option<Activation>,
}

impl Default for ConvBnActConfig {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            stride: 1,
            padding: 1,
            dilation: 1,
            groups: 1,
            bias: false,
            activation: Some(Activation::Relu),
        }
    }
}

#[derive(Debug)]
pub struct ConvBnAct {
    conv: nn::Conv2D,
    bn: nn::BatchNorm,
    in_channels: i64,
    out_channels: i64,
    config: ConvBnActConfig,
}

impl ConvBnAct {
    pub fn new(
        path: &nn::Path,
        in_channels: i64,
        out_channels: i64,
        config: ConvBnActConfig,
    ) -> Result<Self> {
        if in_channels <= 0 || out_channels <= 0 {
            return Err(Error::InvalidConfig(format!(
                "channel counts must be positive, got {in_channels}→{out_channels}"
            )));
        }
        if config.kernel_size <= 0 || config.stride <= 0 || config.dilation <= 0 {
            return Err(Error::InvalidConfig(format!(
                "kernel, stride and dilation must be positive: {config:?}"
            )));
        }
        if config.padding < 0 {
            return Err(Error::InvalidConfig(format!(
                "padding must not be negative, got {}",
                config.padding
            )));
        }
        if config.groups <= 0 || in_channels % config.groups != 0 || out_channels % config.groups != 0
        {
            return Err(Error::InvalidConfig(format!(
                "{} groups do not divide {in_channels}→{out_channels} channels",
                config.groups
            )));
        }

        let conv = nn::conv2d(
            path / "conv",
            in_channels,
            out_channels,
            config.kernel_size,
            nn::ConvConfig {
                stride: config.stride,
                padding: config.padding,
                dilation: config.dilation,
                groups: config.groups,
                bias: config.bias,
                ..Default::default()
            },
        );
        let bn = batch_norm(&(path / "bn"), out_channels);

        Ok(Self {
            conv,
            bn,
            in_channels,
            out_channels,
            config,
        })
    }

    pub fn in_channels(&self) -> i64 {
        self.in_channels
    }

    pub fn out_channels(&self) -> i64 {
        self.out_channels
    }

    pub fn config(&self) -> &ConvBnActConfig {
        &self.config
    }

    /// Spatial size of the output for an `h × w` input.
    pub fn output_hw(&self, h: i64, w: i64) -> (i64, i64) {
        let c = &self.config;
        let span = c.dilation * (c.kernel_size - 1) + 1;
        (
            (h + 2 * c.padding - span) / c.stride + 1,
            (w + 2 * c.padding - span) / c.stride + 1,
        )
    }

    pub fn forward_checked(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        expect_channels("ConvBnAct", xs, self.in_channels)?;
        self.expect_spatial("ConvBnAct", xs)?;
        Ok(self.forward_unchecked(xs, train))
    }

    /// Fails unless the padded input covers the dilated kernel at least once.
    pub(crate) fn expect_spatial(&self, context: &'static str, xs: &Tensor) -> Result<()> {
        let size = xs.size();
        let c = &self.config;
        let span = c.dilation * (c.kernel_size - 1) + 1;
        let (h, w) = (size[2], size[3]);
        if h < 1 || w < 1 || h + 2 * c.padding < span || w + 2 * c.padding < span {
            return Err(Error::ShapeMismatch {
                context,
                expected: format!(
                    "[N, {}, H, W] with H, W >= 1 and H, W + {} >= {span}",
                    self.in_channels,
                    2 * c.padding
                ),
                actual: size,
            });
        }
        Ok(())
    }

    pub(crate) fn forward_unchecked(&self, xs: &Tensor, train: bool) -> Tensor {
        let out = xs.apply(&self.conv).apply_t(&self.bn, train);
        match self.config.activation {
            Some(activation) => activation.apply(&out),
            None => out,
        }
    }

    /// Zero the normalization affine parameters so this unit outputs zeros.
    pub(crate) fn zero_norm_affine(&mut self) {
        tch::no_grad(|| {
            if let Some(ws) = self.bn.ws.as_mut() {
                let _ = ws.zero_();
            }
            if let Some(bs) = self.bn.bs.as_mut() {
                let _ = bs.zero_();
            }
        });
    }
}

impl nn::ModuleT for ConvBnAct {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self.forward_checked(xs, train) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }
}

/// BatchNorm2d with unit scale and zero shift at initialization.
pub(crate) fn batch_norm(path: &nn::Path, channels: i64) -> nn::BatchNorm {
    nn::batch_norm2d(
        path,
        channels,
        nn::BatchNormConfig {
            ws_init: nn::Init::Const(1.0),
            bs_init: nn::Init::Const(0.0),
            ..Default::default()
        },
    )
}

/// Fails unless `xs` is an NCHW batch with `channels` channels.
pub(crate) fn expect_channels(context: &'static str, xs: &Tensor, channels: i64) -> Result<()> {
    let size = xs.size();
    if size.len() != 4 || size[1] != channels {
        return Err(Error::ShapeMismatch {
            context,
            expected: format!("[N, {channels}, H, W]"),
            actual: size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tch::{nn::ModuleT, Device, Kind};

    #[test]
    fn test_conv_bn_act_shape() {
        let vs = nn::VarStore::new(Device::Cpu);
        let unit = ConvBnAct::new(&vs.root(), 5, 16, Default::default()).unwrap();

        let input = Tensor::rand([2, 5, 5, 5], (Kind::Float, Device::Cpu));
        let output = unit.forward_t(&input, true);

        assert_eq!(output.size(), vec![2, 16, 5, 5]);
        assert_eq!(unit.output_hw(5, 5), (5, 5));
    }

    #[test]
    fn test_default_activation_is_non_negative() {
        let vs = nn::VarStore::new(Device::Cpu);
        let unit = ConvBnAct::new(&vs.root(), 3, 8, Default::default()).unwrap();

        let input = Tensor::randn([4, 3, 6, 6], (Kind::Float, Device::Cpu));
        let output = unit.forward_t(&input, true);

        assert!(output.min().double_value(&[]) >= 0.0);
    }

    #[test]
    fn test_no_activation_keeps_negative_values() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = ConvBnActConfig {
            activation: None,
            ..Default::default()
        };
        let unit = ConvBnAct::new(&vs.root(), 3, 8, config).unwrap();

        let input = Tensor::randn([4, 3, 6, 6], (Kind::Float, Device::Cpu));
        let output = unit.forward_t(&input, true);

        // Batch-normalized output is centred on zero
        assert!(output.min().double_value(&[]) < 0.0);
    }

    #[test]
    fn test_stride_and_padding_change_resolution() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = ConvBnActConfig {
            stride: 2,
            ..Default::default()
        };
        let unit = ConvBnAct::new(&vs.root(), 4, 4, config).unwrap();

        let input = Tensor::rand([1, 4, 8, 8], (Kind::Float, Device::Cpu));
        let output = unit.forward_t(&input, false);

        assert_eq!(unit.output_hw(8, 8), (4, 4));
        assert_eq!(output.size(), vec![1, 4, 4, 4]);
    }

    #[test]
    fn test_wrong_channel_count_is_reported() {
        let vs = nn::VarStore::new(Device::Cpu);
        let unit = ConvBnAct::new(&vs.root(), 5, 8, Default::default()).unwrap();

        let input = Tensor::rand([1, 4, 5, 5], (Kind::Float, Device::Cpu));
        let result = unit.forward_checked(&input, false);

        assert_matches!(result, Err(Error::ShapeMismatch { actual, .. }) if actual == vec![1, 4, 5, 5]);
    }

    #[test]
    fn test_input_smaller_than_kernel_reported() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = ConvBnActConfig {
            padding: 0,
            ..Default::default()
        };
        let unit = ConvBnAct::new(&vs.root(), 3, 4, config).unwrap();

        let small = Tensor::rand([1, 3, 2, 2], (Kind::Float, Device::Cpu));
        assert_matches!(
            unit.forward_checked(&small, false),
            Err(Error::ShapeMismatch { context: "ConvBnAct", actual, .. }) if actual == vec![1, 3, 2, 2]
        );

        let exact = Tensor::rand([1, 3, 3, 3], (Kind::Float, Device::Cpu));
        assert_eq!(unit.forward_checked(&exact, false).unwrap().size(), vec![1, 4, 1, 1]);
    }

    #[test]
    fn test_empty_spatial_input_reported() {
        let vs = nn::VarStore::new(Device::Cpu);
        let unit = ConvBnAct::new(&vs.root(), 3, 4, Default::default()).unwrap();

        let empty = Tensor::zeros([2, 3, 0, 0], (Kind::Float, Device::Cpu));
        assert_matches!(unit.forward_checked(&empty, true), Err(Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_leaky_relu_keeps_scaled_negatives() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = ConvBnActConfig {
            activation: Some(Activation::LeakyRelu),
            ..Default::default()
        };
        let unit = ConvBnAct::new(&vs.root(), 3, 8, config).unwrap();
        assert_eq!(unit.config().activation, Some(Activation::LeakyRelu));

        let xs = Tensor::from_slice(&[-2.0f32, 0.0, 3.0]);
        let ys = Vec::<f32>::try_from(&Activation::LeakyRelu.apply(&xs)).unwrap();
        assert!((ys[0] + 0.02).abs() < 1e-6);
        assert_eq!(ys[2], 3.0);

        let input = Tensor::randn([4, 3, 6, 6], (Kind::Float, Device::Cpu));
        assert!(unit.forward_t(&input, true).min().double_value(&[]) < 0.0);
    }

    #[test]
    fn test_invalid_groups_rejected() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = ConvBnActConfig {
            groups: 3,
            ..Default::default()
        };
        let result = ConvBnAct::new(&vs.root(), 4, 8, config);

        assert_matches!(result, Err(Error::InvalidConfig(_)));
    }

    #[test]
    fn test_eval_mode_leaves_running_stats_untouched() {
        let vs = nn::VarStore::new(Device::Cpu);
        let unit = ConvBnAct::new(&vs.root(), 2, 2, Default::default()).unwrap();
        let running_mean = || {
            vs.variables()
                .into_iter()
                .find(|(name, _)| name.ends_with("running_mean"))
                .map(|(_, t)| t.copy())
                .unwrap()
        };

        let before = running_mean();
        let input = Tensor::randn([8, 2, 4, 4], (Kind::Float, Device::Cpu)) + 3.0;
        let _ = unit.forward_t(&input, false);
        assert!(before.equal(&running_mean()));

        let _ = unit.forward_t(&input, true);
        assert!(!before.equal(&running_mean()));
    }
}
