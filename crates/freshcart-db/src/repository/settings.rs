//! # Settings Repository
//!
//! The configuration singletons: fee policy, invoice metadata, and
//! seasonal themes. Reads never fail on absence; built-in defaults stand
//! in until an admin writes the row.

use sqlx::SqlitePool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::live::{ChangeHub, Watched};
use freshcart_core::{
    DecodeError, FeeConfiguration, InvoiceSettings, Money, Percent, ThemeKind, ThemeSettings,
    FEE_CONFIGURATION_ID,
};

/// Fixed primary key of the invoice-settings singleton row.
const INVOICE_SETTINGS_ID: &str = "default";

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct FeeConfigurationRow {
    handling_fee: i64,
    handling_fee_enabled: bool,
    handling_fee_waived: bool,
    delivery_fee: i64,
    delivery_fee_enabled: bool,
    delivery_fee_waived: bool,
    free_delivery_threshold: i64,
    tax_bps: i64,
    rain_fee: i64,
    rain_fee_enabled: bool,
    rain_fee_active: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FeeConfigurationRow> for FeeConfiguration {
    type Error = StoreError;

    fn try_from(row: FeeConfigurationRow) -> StoreResult<FeeConfiguration> {
        let tax_bps = u32::try_from(row.tax_bps)
            .map_err(|_| StoreError::Query(format!("tax_bps out of range: {}", row.tax_bps)))?;
        Ok(FeeConfiguration {
            handling_fee: Money::from_minor(row.handling_fee),
            handling_fee_enabled: row.handling_fee_enabled,
            handling_fee_waived: row.handling_fee_waived,
            delivery_fee: Money::from_minor(row.delivery_fee),
            delivery_fee_enabled: row.delivery_fee_enabled,
            delivery_fee_waived: row.delivery_fee_waived,
            free_delivery_threshold: Money::from_minor(row.free_delivery_threshold),
            tax_rate: Percent::from_bps(tax_bps),
            rain_fee: Money::from_minor(row.rain_fee),
            rain_fee_enabled: row.rain_fee_enabled,
            rain_fee_active: row.rain_fee_active,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceSettingsRow {
    business_name: String,
    business_address: String,
    gst_number: Option<String>,
    support_phone: Option<String>,
    support_email: Option<String>,
    footer_note: Option<String>,
    show_tax_breakdown: bool,
    updated_at: DateTime<Utc>,
}

impl From<InvoiceSettingsRow> for InvoiceSettings {
    fn from(row: InvoiceSettingsRow) -> InvoiceSettings {
        InvoiceSettings {
            business_name: row.business_name,
            business_address: row.business_address,
            gst_number: row.gst_number,
            support_phone: row.support_phone,
            support_email: row.support_email,
            footer_note: row.footer_note,
            show_tax_breakdown: row.show_tax_breakdown,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThemeSettingsRow {
    kind: String,
    enabled: bool,
    banner_text: Option<String>,
    accent_color: Option<String>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ThemeSettingsRow> for ThemeSettings {
    type Error = DecodeError;

    fn try_from(row: ThemeSettingsRow) -> Result<ThemeSettings, DecodeError> {
        Ok(ThemeSettings {
            kind: ThemeKind::parse(&row.kind)?,
            enabled: row.enabled,
            banner_text: row.banner_text,
            accent_color: row.accent_color,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Settings Repository
// =============================================================================

/// Repository for the configuration singletons.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    hub: Arc<ChangeHub>,
}

impl SettingsRepository {
    pub(crate) fn new(pool: SqlitePool, hub: Arc<ChangeHub>) -> Self {
        SettingsRepository { pool, hub }
    }

    // -------------------------------------------------------------------------
    // Fee configuration
    // -------------------------------------------------------------------------

    /// The current fee policy. Seeds the built-in default row on first
    /// read so checkout and the admin screen see the same values.
    pub async fn fee_configuration(&self) -> StoreResult<FeeConfiguration> {
        let row: Option<FeeConfigurationRow> = sqlx::query_as(
            "SELECT handling_fee, handling_fee_enabled, handling_fee_waived, \
                    delivery_fee, delivery_fee_enabled, delivery_fee_waived, \
                    free_delivery_threshold, tax_bps, \
                    rain_fee, rain_fee_enabled, rain_fee_active, updated_at \
             FROM fee_configuration WHERE id = ?1",
        )
        .bind(FEE_CONFIGURATION_ID)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => FeeConfiguration::try_from(row),
            None => {
                let config = FeeConfiguration::default();
                debug!("seeding default fee configuration");
                self.write_fee_configuration(&config, true).await?;
                Ok(config)
            }
        }
    }

    /// Replaces the fee policy.
    pub async fn save_fee_configuration(&self, config: &FeeConfiguration) -> StoreResult<()> {
        self.write_fee_configuration(config, false).await?;
        self.hub.mark(Watched::Settings);
        Ok(())
    }

    async fn write_fee_configuration(
        &self,
        config: &FeeConfiguration,
        seed_only: bool,
    ) -> StoreResult<()> {
        // Seeding must not clobber a row written between the read and here
        let verb = if seed_only { "INSERT OR IGNORE" } else { "INSERT OR REPLACE" };
        let sql = format!(
            "{verb} INTO fee_configuration \
                (id, handling_fee, handling_fee_enabled, handling_fee_waived, \
                 delivery_fee, delivery_fee_enabled, delivery_fee_waived, \
                 free_delivery_threshold, tax_bps, \
                 rain_fee, rain_fee_enabled, rain_fee_active, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        );
        sqlx::query(&sql)
            .bind(FEE_CONFIGURATION_ID)
            .bind(config.handling_fee.minor())
            .bind(config.handling_fee_enabled)
            .bind(config.handling_fee_waived)
            .bind(config.delivery_fee.minor())
            .bind(config.delivery_fee_enabled)
            .bind(config.delivery_fee_waived)
            .bind(config.free_delivery_threshold.minor())
            .bind(i64::from(config.tax_rate.bps()))
            .bind(config.rain_fee.minor())
            .bind(config.rain_fee_enabled)
            .bind(config.rain_fee_active)
            .bind(config.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice settings
    // -------------------------------------------------------------------------

    /// Invoicing metadata; built-in defaults when never configured.
    pub async fn invoice_settings(&self) -> StoreResult<InvoiceSettings> {
        let row: Option<InvoiceSettingsRow> = sqlx::query_as(
            "SELECT business_name, business_address, gst_number, support_phone, \
                    support_email, footer_note, show_tax_breakdown, updated_at \
             FROM invoice_settings WHERE id = ?1",
        )
        .bind(INVOICE_SETTINGS_ID)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(InvoiceSettings::from).unwrap_or_default())
    }

    /// Replaces the invoicing metadata.
    pub async fn save_invoice_settings(&self, settings: &InvoiceSettings) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO invoice_settings \
                (id, business_name, business_address, gst_number, support_phone, \
                 support_email, footer_note, show_tax_breakdown, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(INVOICE_SETTINGS_ID)
        .bind(&settings.business_name)
        .bind(&settings.business_address)
        .bind(&settings.gst_number)
        .bind(&settings.support_phone)
        .bind(&settings.support_email)
        .bind(&settings.footer_note)
        .bind(settings.show_tax_breakdown)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;
        self.hub.mark(Watched::Settings);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Themes
    // -------------------------------------------------------------------------

    /// A theme's settings; disabled defaults when never configured.
    pub async fn theme(&self, kind: ThemeKind) -> StoreResult<ThemeSettings> {
        let row: Option<ThemeSettingsRow> = sqlx::query_as(
            "SELECT kind, enabled, banner_text, accent_color, starts_at, ends_at, updated_at \
             FROM theme_settings WHERE kind = ?1",
        )
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(ThemeSettings::try_from(row)?),
            None => Ok(ThemeSettings::disabled(kind)),
        }
    }

    /// Replaces one theme's settings (keyed by its kind).
    pub async fn save_theme(&self, settings: &ThemeSettings) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO theme_settings \
                (kind, enabled, banner_text, accent_color, starts_at, ends_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(settings.kind.as_str())
        .bind(settings.enabled)
        .bind(&settings.banner_text)
        .bind(&settings.accent_color)
        .bind(settings.starts_at)
        .bind(settings.ends_at)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;
        self.hub.mark(Watched::Settings);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
