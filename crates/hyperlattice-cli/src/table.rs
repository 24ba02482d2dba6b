// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Result Table
// ─────────────────────────────────────────────────────────────────────

use colored::Colorize;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use hyperlattice_types::DimensionData;

/// Values below this magnitude print in scientific notation.
pub const SCIENTIFIC_THRESHOLD: f64 = 1e-3;

const TITLE: &str = "Hyperlattice energy sweep";

/// `0.000000` for exact zero, `{:.6e}` below the threshold, else `{:.6}`.
pub fn format_value(x: f64) -> String {
    if x == 0.0 {
        "0.000000".to_string()
    } else if x.abs() < SCIENTIFIC_THRESHOLD {
        format!("{x:.6e}")
    } else {
        format!("{x:.6}")
    }
}

/// One printed row of the sweep.
#[derive(Tabled)]
struct SweepRow {
    #[tabled(rename = "dimension")]
    dimension: usize,
    #[tabled(rename = "scale")]
    scale: String,
    #[tabled(rename = "observable")]
    observable: String,
    #[tabled(rename = "potential")]
    potential: String,
    #[tabled(rename = "nurbMatter")]
    nurb_matter: String,
    #[tabled(rename = "nurbEnergy")]
    nurb_energy: String,
    #[tabled(rename = "nurbRegularMatter")]
    nurb_regular_matter: String,
    #[tabled(rename = "spinEnergy")]
    spin_energy: String,
    #[tabled(rename = "momentumEnergy")]
    momentum_energy: String,
    #[tabled(rename = "fieldEnergy")]
    field_energy: String,
    #[tabled(rename = "godWaveEnergy")]
    god_wave_energy: String,
}

impl From<&DimensionData> for SweepRow {
    fn from(row: &DimensionData) -> Self {
        Self {
            dimension: row.dimension,
            scale: format_value(row.scale),
            observable: format_value(row.observable),
            potential: format_value(row.potential),
            nurb_matter: format_value(row.nurb_matter),
            nurb_energy: format_value(row.nurb_energy),
            nurb_regular_matter: format_value(row.nurb_regular_matter),
            spin_energy: format_value(row.spin_energy),
            momentum_energy: format_value(row.momentum_energy),
            field_energy: format_value(row.field_energy),
            god_wave_energy: format_value(row.god_wave_energy),
        }
    }
}

/// Title line plus a right-aligned table, one row per dimension.
/// `colour` styles the title; pass it only when stdout is a terminal.
pub fn render_table(rows: &[DimensionData], colour: bool) -> String {
    let title = if colour {
        TITLE.bold().cyan().to_string()
    } else {
        TITLE.to_string()
    };
    let table = Table::new(rows.iter().map(SweepRow::from))
        .with(Style::rounded())
        .with(Alignment::right())
        .to_string();
    format!("{title}\n{table}\n")
}
