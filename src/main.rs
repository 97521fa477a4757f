// Copyright 2025 pricewatch
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use migration::{Migrator, MigratorTrait};
use pricewatch::config::settings::Settings;
use pricewatch::engines::chromium_engine::ChromiumPageFactory;
use pricewatch::infrastructure::database::connection;
use pricewatch::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use pricewatch::utils::telemetry;
use pricewatch::workers::crawl_scheduler::CrawlScheduler;
use std::sync::Arc;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动调度器
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting pricewatch...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);

    // Refuse to start without a reachable database
    if let Err(e) = connection::verify_connectivity(db.as_ref()).await {
        error!("Database connectivity check failed: {}", e);
        std::process::exit(1);
    }
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize components
    let repository = Arc::new(JobRepositoryImpl::new(
        db.clone(),
        settings.scheduler.batch_size,
    ));
    let factory = Arc::new(ChromiumPageFactory);

    // 5. Start the scheduler
    let scheduler = Arc::new(CrawlScheduler::new(
        repository,
        factory,
        settings.scheduler.clone(),
    ));
    let scheduler_handle = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler.run().await;
        })
    };

    // 6. Shut down on Ctrl+C, giving in-flight jobs a grace period
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping scheduler");
    scheduler_handle.abort();
    scheduler.wait_for_drain().await;
    info!("pricewatch stopped");

    Ok(())
}
