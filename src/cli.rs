//! Interface de linha de comando do sweeper baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, schedule, config)
//! e flags globais (--config, --verbose, --json-logs).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::error::{Result, SweeperError};

/// Move pedidos entregues há mais de três dias para `Shipped`.
#[derive(Debug, Parser)]
#[command(name = "order-sweeper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho para o arquivo de configuração.
    #[arg(long, global = true, default_value = crate::config::CONFIG_FILE)]
    pub config: PathBuf,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emite os logs como JSON, uma linha por evento.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa uma única varredura e sai.
    Run {
        /// Instante de referência em RFC 3339 (padrão: agora).
        #[arg(long)]
        now: Option<String>,

        /// Seleciona os pedidos sem gravar nada.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Imprime o relatório em JSON em vez do resumo colorido.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Arquivo JSON com pedidos para varrer em memória, sem Firestore.
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Executa a varredura periodicamente até receber Ctrl-C.
    Schedule {
        /// Sobrescreve o intervalo configurado, em horas.
        #[arg(long)]
        interval_hours: Option<u64>,
    },

    /// Mostra a configuração efetiva.
    Config,
}

/// Interpreta o valor de `--now`.
pub fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| SweeperError::InvalidTimestamp(format!("{s}: {e}"))),
    }
}
