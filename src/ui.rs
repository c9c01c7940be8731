//! Interface de terminal do sweeper — spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`SweepProgress`] acompanha visualmente
//! uma varredura executada pelo comando `run`.

use std::io::Write;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::error::Result;
use crate::order::Order;
use crate::sweeper::{SweepOutcome, SweepReport};

/// Indicador visual de progresso para uma varredura no terminal.
///
/// Exibe um spinner enquanto a consulta e o commit estão em andamento e
/// mensagens coloridas para sucesso (verde), falha (vermelho) e execuções
/// sem efeito (amarelo).
pub struct SweepProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl SweepProgress {
    /// Inicia o spinner com o destino da varredura.
    pub fn start(target: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Sweeping delivered orders in {target}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Finaliza o spinner e exibe o resumo do relatório.
    pub fn complete(&self, report: &SweepReport) {
        self.pb.finish_and_clear();
        let days = report.grace_period_days;
        match report.outcome {
            SweepOutcome::Shipped => println!(
                "  {} Marked {} order(s) as Shipped",
                self.green.apply_to("✓"),
                report.processed()
            ),
            SweepOutcome::DryRun => println!(
                "  {} Dry run: {} order(s) would be marked as Shipped",
                self.yellow.apply_to("○"),
                report.shipped.len()
            ),
            SweepOutcome::NoneEligible => println!(
                "  {} No orders met the {days}-day criteria",
                self.yellow.apply_to("○")
            ),
            SweepOutcome::NothingDelivered => println!(
                "  {} No delivered orders to process",
                self.yellow.apply_to("○")
            ),
        }
        for id in &report.shipped {
            println!("    {} {id}", self.dim.apply_to("→"));
        }
        println!(
            "  {}",
            self.dim.apply_to(format!(
                "run {} · cutoff {} · fetched {} · skipped {}",
                report.run_id,
                report.cutoff.to_rfc3339(),
                report.fetched,
                report.skipped.len()
            ))
        );
    }

    /// Finaliza o spinner e exibe a falha.
    pub fn fail(&self, error: &dyn std::fmt::Display) {
        self.pb.finish_and_clear();
        println!("  {} Sweep failed: {error}", self.red.apply_to("✗"));
    }
}

/// Imprime o relatório formatado em JSON.
pub fn print_report_json(report: &SweepReport) -> Result<()> {
    write_json(&mut std::io::stdout().lock(), report)
}

/// Imprime o estado final dos pedidos de um arquivo de seed.
pub fn print_orders_json(orders: &[Order]) -> Result<()> {
    write_json(&mut std::io::stdout().lock(), orders)
}

/// Escreve `value` como JSON indentado seguido de nova linha.
/// Falhas de serialização ou de escrita são devolvidas, nunca engolidas.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SweeperError;
    use crate::order::OrderStatus;
    use std::collections::BTreeMap;

    #[test]
    fn write_json_prints_orders() {
        let mut out = Vec::new();
        write_json(&mut out, &[Order::new("C", OrderStatus::Shipped)]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back[0]["id"], "C");
        assert_eq!(back[0]["status"], "Shipped");
    }

    #[test]
    fn write_json_reports_serialization_failure() {
        // JSON object keys must be strings.
        let bad: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let mut out = Vec::new();

        let err = write_json(&mut out, &bad).unwrap_err();

        assert!(matches!(err, SweeperError::Json(_)));
    }
}
