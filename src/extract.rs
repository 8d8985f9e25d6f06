// Copyright 2024 Saorsa Labs Limited
//
// This software is dual-licensed under:
// - GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later)
// - Commercial License
//
// For AGPL-3.0 license, see LICENSE-AGPL-3.0
// For commercial licensing, contact: saorsalabs@gmail.com
//
// Unless required by applicable law or agreed to in writing, software
// distributed under these licenses is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.

//! One extraction run: connect, resolve, persist, close

use crate::config::Config;
use crate::output::{self, Persisted};
use crate::resolver::{ResolutionReport, Resolver};
use crate::store::{self, IdentityStore};
use crate::Result;
use tracing::{error, info};

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub report: ResolutionReport,
    pub persisted: Persisted,
}

/// Run the extractor against the store named in `config`
pub async fn run_extraction(config: &Config) -> Result<ExtractionOutcome> {
    let store = store::connect(&config.database).await.inspect_err(|e| {
        error!("❌ Could not connect to the session store: {}", e);
    })?;
    info!("✅ Connected to the session store");

    run_with_store(store.as_ref(), config).await
}

/// Run the extractor against an already connected store. The store is closed
/// before returning, whatever the outcome.
pub async fn run_with_store(
    store: &dyn IdentityStore,
    config: &Config,
) -> Result<ExtractionOutcome> {
    let result = resolve_and_persist(store, config).await;
    store.close().await;

    match &result {
        Ok(outcome) => info!(
            "🏁 Finished: {} of {} session(s) resolved",
            outcome.report.resolved(),
            outcome.report.sessions
        ),
        Err(e) => error!("❌ Extraction failed: {}", e),
    }
    result
}

async fn resolve_and_persist(
    store: &dyn IdentityStore,
    config: &Config,
) -> Result<ExtractionOutcome> {
    let resolver = Resolver::new(store, config.resolver.clone());
    let report = resolver.resolve_all().await?;
    let persisted = output::persist(&report.document, &config.output.path)?;

    Ok(ExtractionOutcome { report, persisted })
}
