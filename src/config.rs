//! Configuração do sweeper carregada a partir de `sweeper.toml`.
//!
//! A struct [`SweeperConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! Variáveis de ambiente (`GOOGLE_CLOUD_PROJECT`, `FIRESTORE_ACCESS_TOKEN`,
//! `FIRESTORE_EMULATOR_HOST`) têm precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SweeperError};
use crate::store::FirestoreClient;
use crate::store::firestore::client::{API_URL, DEFAULT_DATABASE};
use crate::sweeper::SweepSettings;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "sweeper.toml";

/// Maior período de carência aceito (100 anos).
pub const MAX_GRACE_PERIOD_DAYS: u32 = 36_500;

/// Maior intervalo aceito entre execuções (1 ano).
pub const MAX_INTERVAL_HOURS: u64 = 24 * 366;

/// Configuração de nível superior carregada de `sweeper.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Projeto do Google Cloud que hospeda o banco Firestore.
    #[serde(default)]
    pub project_id: String,

    /// Identificador do banco dentro do projeto.
    #[serde(default = "default_database")]
    pub database: String,

    /// Coleção que guarda os pedidos.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Dias que um pedido fica em `Delivered` antes de virar `Shipped`.
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,

    /// Intervalo entre execuções agendadas, em horas.
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// URL base da API REST (ou do emulador).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Token OAuth enviado como `Bearer`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Envia o limite de `deliveredAt` na própria consulta.
    /// Exige um índice composto em `status` + `deliveredAt`.
    #[serde(default)]
    pub query_cutoff: bool,
}

// Valor padrão para o banco: "(default)".
fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

// Valor padrão para a coleção: "orders".
fn default_collection() -> String {
    "orders".to_string()
}

// Valor padrão para o período de carência: 3 dias.
fn default_grace_period_days() -> u32 {
    3
}

// Valor padrão para o intervalo: 24 horas.
fn default_interval_hours() -> u64 {
    24
}

fn default_base_url() -> String {
    API_URL.to_string()
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: default_database(),
            collection: default_collection(),
            grace_period_days: default_grace_period_days(),
            interval_hours: default_interval_hours(),
            base_url: default_base_url(),
            access_token: None,
            query_cutoff: false,
        }
    }
}

impl SweeperConfig {
    /// Carrega a configuração de `sweeper.toml` no diretório atual.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de `path`.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<SweeperConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Aplica sobrescritas vindas do ambiente. Valores vazios são ignorados.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(project) = var("GOOGLE_CLOUD_PROJECT") {
            self.project_id = project;
        }

        if let Some(host) = var("FIRESTORE_EMULATOR_HOST") {
            self.base_url = format!("http://{host}");
            // O emulador aceita "owner" e ignora as regras de segurança.
            if self.access_token.is_none() {
                self.access_token = Some("owner".to_string());
            }
        }

        if let Some(token) = var("FIRESTORE_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        interval_from_hours(self.interval_hours)?;
        if self.grace_period_days > MAX_GRACE_PERIOD_DAYS {
            return Err(SweeperError::Config(format!(
                "grace_period_days must be at most {MAX_GRACE_PERIOD_DAYS}"
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(SweeperError::Config("collection must not be empty".into()));
        }
        Ok(())
    }

    /// Intervalo entre execuções agendadas.
    pub fn interval(&self) -> Result<Duration> {
        interval_from_hours(self.interval_hours)
    }

    /// Parâmetros de uma varredura derivados desta configuração.
    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            grace_period: chrono::Duration::days(i64::from(self.grace_period_days)),
            query_cutoff: self.query_cutoff,
            dry_run: false,
        }
    }

    /// Cria o cliente Firestore. Falha se `project_id` não estiver definido.
    pub fn firestore_client(&self) -> Result<FirestoreClient> {
        if self.project_id.trim().is_empty() {
            return Err(SweeperError::Config(
                "project_id must be set (sweeper.toml or GOOGLE_CLOUD_PROJECT)".into(),
            ));
        }

        let mut client = FirestoreClient::with_base_url(
            self.project_id.clone(),
            self.collection.clone(),
            self.base_url.clone(),
        )?
        .with_database(self.database.clone());
        if let Some(token) = &self.access_token {
            client = client.with_access_token(token.clone());
        }
        Ok(client)
    }
}

/// Converte horas em [`Duration`], dentro de `1..=MAX_INTERVAL_HOURS`.
pub fn interval_from_hours(hours: u64) -> Result<Duration> {
    if !(1..=MAX_INTERVAL_HOURS).contains(&hours) {
        return Err(SweeperError::Config(format!(
            "interval_hours must be between 1 and {MAX_INTERVAL_HOURS}"
        )));
    }
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| SweeperError::Config(format!("interval of {hours} hours overflows")))
}
