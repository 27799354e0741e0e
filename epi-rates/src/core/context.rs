//! DataFusion context management.
//!
//! [`EpiContext`] wraps DataFusion's [`SessionContext`]. Sources use it to
//! read CSV inputs with explicit schemas, and callers can register a computed
//! metrics table in it for ad-hoc SQL.

use super::records::MetricRow;
use crate::prelude::*;
use crate::sink::metrics_batch;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::execution::context::{SessionConfig, SessionContext};
use datafusion::prelude::CsvReadOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Configuration for creating an [`EpiContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpiContextConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Target number of partitions; inputs are small so one is plenty
    pub target_partitions: usize,
}

impl Default for EpiContextConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: 1,
        }
    }
}

/// CSV layout of a file read through [`EpiContext::read_csv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLayout {
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
        }
    }
}

/// A managed DataFusion context.
///
/// # Examples
///
/// ```rust,no_run
/// use epi_rates::core::EpiContext;
///
/// # async fn example(rows: &[epi_rates::core::MetricRow]) -> epi_rates::prelude::Result<()> {
/// let mut ctx = EpiContext::new()?;
/// ctx.register_metrics("metrics", rows)?;
/// let df = ctx
///     .inner()
///     .sql("SELECT state, max(adjusted_positive_per_100k) FROM metrics GROUP BY state")
///     .await?;
/// df.show().await?;
/// # Ok(())
/// # }
/// ```
pub struct EpiContext {
    inner: SessionContext,
    tables: HashMap<String, Arc<dyn TableProvider>>,
    config: EpiContextConfig,
}

impl EpiContext {
    /// Creates a new context with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(EpiContextConfig::default())
    }

    /// Creates a new context with custom configuration.
    #[instrument(skip(config))]
    pub fn with_config(config: EpiContextConfig) -> Result<Self> {
        if config.batch_size == 0 || config.target_partitions == 0 {
            return Err(EpiError::Configuration(
                "batch_size and target_partitions must be positive".to_string(),
            ));
        }

        let session_config = SessionConfig::new()
            .with_batch_size(config.batch_size)
            .with_target_partitions(config.target_partitions)
            .with_information_schema(true);

        Ok(Self {
            inner: SessionContext::new_with_config(session_config),
            tables: HashMap::new(),
            config,
        })
    }

    /// Returns the underlying DataFusion [`SessionContext`].
    pub fn inner(&self) -> &SessionContext {
        &self.inner
    }

    /// Returns the configuration used to create this context.
    pub fn config(&self) -> &EpiContextConfig {
        &self.config
    }

    /// Returns the names of all registered tables.
    pub fn registered_tables(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Checks if a table is registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Reads one or more CSV files with an explicit schema and collects them.
    ///
    /// Empty fields load as nulls. The file extension of the first path is
    /// used for every path, so mixed extensions are not supported.
    #[instrument(skip(self, schema), fields(files = paths.len()))]
    pub async fn read_csv(
        &self,
        paths: &[String],
        schema: &Schema,
        layout: CsvLayout,
    ) -> Result<Vec<RecordBatch>> {
        let first = paths.first().ok_or_else(|| {
            EpiError::Configuration("At least one path must be provided".to_string())
        })?;
        let extension = std::path::Path::new(first)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let options = CsvReadOptions::new()
            .has_header(layout.has_header)
            .delimiter(layout.delimiter)
            .file_extension(&extension)
            .schema(schema);

        let df = self.inner.read_csv(paths.to_vec(), options).await?;
        let batches = df.collect().await?;

        debug!(
            batches = batches.len(),
            rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            "Collected CSV input"
        );
        Ok(batches)
    }

    /// Registers computed metric rows as an in-memory table.
    pub fn register_metrics(&mut self, name: &str, rows: &[MetricRow]) -> Result<()> {
        let batch = metrics_batch(rows)?;
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        self.register_table_provider(name, Arc::new(table))
    }

    /// Registers a table provider directly and tracks it.
    pub fn register_table_provider(
        &mut self,
        name: &str,
        provider: Arc<dyn TableProvider>,
    ) -> Result<()> {
        self.inner.register_table(name, provider.clone())?;
        self.tables.insert(name.to_string(), provider);
        Ok(())
    }

    /// Deregisters a table from the context.
    pub fn deregister_table(&mut self, name: &str) -> Result<()> {
        self.inner.deregister_table(name)?;
        self.tables.remove(name);
        Ok(())
    }

    /// Clears all registered tables.
    pub fn clear_tables(&mut self) -> Result<()> {
        let table_names: Vec<_> = self.tables.keys().cloned().collect();
        for name in table_names {
            self.deregister_table(&name)?;
        }
        Ok(())
    }
}

impl Drop for EpiContext {
    fn drop(&mut self) {
        if let Err(e) = self.clear_tables() {
            tracing::warn!("Failed to clear tables during EpiContext drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::baseline::first_observations;
    use crate::core::metrics::compute;
    use crate::core::records::{CaseRecord, DemographicRecord};
    use arrow::array::{Array, Int64Array};
    use chrono::NaiveDate;

    #[test]
    fn test_default_config() {
        let config = EpiContextConfig::default();
        assert_eq!(config.batch_size, 8192);
        assert_eq!(config.target_partitions, 1);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let config = EpiContextConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            EpiContext::with_config(config),
            Err(EpiError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_register_and_query_metrics() {
        let day = |d| NaiveDate::from_ymd_opt(2020, 3, d).unwrap();
        let cases = vec![
            CaseRecord::new("WY", day(10)).with_positive(Some(10)),
            CaseRecord::new("WY", day(15)).with_positive(Some(50)),
        ];
        let demographics = vec![DemographicRecord::new("56", Some(500_000))];
        let table = compute(&cases, &demographics, &first_observations(&cases)).unwrap();

        let mut ctx = EpiContext::new().unwrap();
        ctx.register_metrics("metrics", &table.rows).unwrap();
        assert!(ctx.has_table("metrics"));

        let batches = ctx
            .inner()
            .sql("SELECT count(*) AS n FROM metrics WHERE days_since_first_case IS NOT NULL")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        let counts = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.value(0), 2);

        ctx.deregister_table("metrics").unwrap();
        assert!(ctx.registered_tables().is_empty());
    }
}
