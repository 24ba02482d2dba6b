// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Command-Line Options
// ─────────────────────────────────────────────────────────────────────

use std::path::PathBuf;

use clap::Parser;

use hyperlattice_types::{LatticeConfig, LatticeError, LatticeResult, ParamKey};

/// N-dimensional lattice energy calculator.
#[derive(Parser, Debug)]
#[command(
    name = "hyperlattice",
    about = "Sweep lattice dimensions and print the reduced energy table"
)]
pub struct Cli {
    /// Dimension bound d_max (1..26).
    #[arg(short = 'd', long = "dimensions")]
    pub dimensions: Option<usize>,

    /// Initial dimension (1..d_max).
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<usize>,

    /// Time steps to run before the sweep.
    #[arg(short = 't', long = "timesteps", default_value_t = 10)]
    pub timesteps: usize,

    /// Integration step.
    #[arg(short = 's', long = "dt")]
    pub dt: Option<f64>,

    #[arg(short = 'i', long = "influence")]
    pub influence: Option<f64>,

    #[arg(short = 'w', long = "weak")]
    pub weak: Option<f64>,

    #[arg(short = 'c', long = "collapse")]
    pub collapse: Option<f64>,

    #[arg(short = '2', long = "twod")]
    pub two_d: Option<f64>,

    #[arg(short = '3', long = "threed")]
    pub three_d: Option<f64>,

    #[arg(short = '1', long = "oned")]
    pub one_d: Option<f64>,

    #[arg(short = 'n', long = "nurbmatter")]
    pub nurb_matter: Option<f64>,

    #[arg(short = 'e', long = "nurbenergy")]
    pub nurb_energy: Option<f64>,

    #[arg(long = "nurbregular")]
    pub nurb_regular: Option<f64>,

    #[arg(short = 'a', long = "alpha")]
    pub alpha: Option<f64>,

    #[arg(short = 'b', long = "beta")]
    pub beta: Option<f64>,

    #[arg(short = 'r', long = "carroll")]
    pub carroll: Option<f64>,

    #[arg(short = 'f', long = "meanfield")]
    pub mean_field: Option<f64>,

    #[arg(short = 'y', long = "asymcollapse")]
    pub asym_collapse: Option<f64>,

    #[arg(short = 'p', long = "perspectivetrans")]
    pub perspective_trans: Option<f64>,

    #[arg(short = 'q', long = "perspectivefocal")]
    pub perspective_focal: Option<f64>,

    #[arg(short = 'x', long = "spininteraction")]
    pub spin_interaction: Option<f64>,

    #[arg(short = 'z', long = "emfield")]
    pub em_field: Option<f64>,

    #[arg(short = 'u', long = "renorm")]
    pub renorm: Option<f64>,

    #[arg(short = 'v', long = "vacuum")]
    pub vacuum: Option<f64>,

    #[arg(short = 'g', long = "godwavefreq")]
    pub god_wave_freq: Option<f64>,

    /// Material density factor of the NURBS kernels.
    #[arg(long = "density")]
    pub density: Option<f64>,

    /// Lattice vertex count.
    #[arg(short = 'V', long = "vertices")]
    pub vertices: Option<usize>,

    /// Worker threads (0 = every core).
    #[arg(long = "threads")]
    pub threads: Option<usize>,

    /// Reject out-of-range values instead of clamping them.
    #[arg(long)]
    pub strict: bool,

    /// First dimension of the sweep.
    #[arg(long)]
    pub start: Option<usize>,

    /// Last dimension of the sweep (default d_max).
    #[arg(long)]
    pub end: Option<usize>,

    /// JSON parameter file; flags override its values.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose trace output.
    #[arg(long)]
    pub debug: bool,
}

/// Process exit code for a parse failure: `0` for help output, `1` otherwise.
pub fn parse_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

impl Cli {
    fn overrides(&self) -> [(ParamKey, Option<f64>); 23] {
        [
            (ParamKey::TimeStep, self.dt),
            (ParamKey::Influence, self.influence),
            (ParamKey::Weak, self.weak),
            (ParamKey::Collapse, self.collapse),
            (ParamKey::TwoD, self.two_d),
            (ParamKey::ThreeDInfluence, self.three_d),
            (ParamKey::OneDPermeation, self.one_d),
            (ParamKey::NurbMatterStrength, self.nurb_matter),
            (ParamKey::NurbEnergyStrength, self.nurb_energy),
            (ParamKey::NurbRegularMatterStrength, self.nurb_regular),
            (ParamKey::Alpha, self.alpha),
            (ParamKey::Beta, self.beta),
            (ParamKey::CarrollFactor, self.carroll),
            (ParamKey::MeanFieldApprox, self.mean_field),
            (ParamKey::AsymCollapse, self.asym_collapse),
            (ParamKey::PerspectiveTrans, self.perspective_trans),
            (ParamKey::PerspectiveFocal, self.perspective_focal),
            (ParamKey::SpinInteraction, self.spin_interaction),
            (ParamKey::EmFieldStrength, self.em_field),
            (ParamKey::RenormFactor, self.renorm),
            (ParamKey::VacuumEnergy, self.vacuum),
            (ParamKey::GodWaveFreq, self.god_wave_freq),
            (ParamKey::MaterialDensity, self.density),
        ]
    }

    /// Parameter block: the JSON file (if any), then every flag on top.
    pub fn build_config(&self) -> LatticeResult<LatticeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    LatticeError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                LatticeConfig::from_json(&json)?
            }
            None => LatticeConfig::default(),
        };

        if self.strict {
            config.strict = true;
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(d) = self.dimensions {
            config.max_dimensions = d;
            if self.mode.is_none() && config.mode > d {
                config.mode = d;
            }
        }
        if let Some(m) = self.mode {
            config.mode = m;
        }
        if let Some(v) = self.vertices {
            config.num_vertices = v;
        }
        if let Some(t) = self.threads {
            config.threads = t;
        }

        for (key, value) in self.overrides() {
            let Some(v) = value else { continue };
            if config.strict {
                config.set_strict(key, v)?;
            } else {
                config.set(key, v);
            }
        }
        Ok(config)
    }
}
