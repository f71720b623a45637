use clap::Parser;
use clinic_locator::core::discovery::PanelContent;
use clinic_locator::core::layout::Viewport;
use clinic_locator::domain::model::ServiceFilterSet;
use clinic_locator::utils::error::ErrorSeverity;
use clinic_locator::utils::{logger, validation::Validate};
use clinic_locator::{CliConfig, Composition, DiscoveryScreen, FixedGeolocation, HttpClinicApi};

fn print_content(content: &PanelContent) {
    println!("📋 Status: {:?} (radius {} km)", content.status, content.radius_km);
    for clinic in &content.results {
        println!(
            "  • {} | {} ({:.1} km)",
            clinic.name, clinic.address, clinic.distance_km
        );
    }
    if let Some(notice) = &content.notice {
        println!("⚠️  {}", notice.message);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting clinic-locator CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證參數與配置
    let config = match cli.validate().and_then(|_| cli.resolve()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(
                "❌ Configuration validation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = match e.severity() {
                ErrorSeverity::Low | ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    };

    let api = match HttpClinicApi::from_config(&config.api) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    let geolocation = FixedGeolocation::from_coordinates(cli.latitude, cli.longitude);
    let mut screen = DiscoveryScreen::new(
        &config,
        Viewport::new(cli.viewport_width, cli.viewport_height, 0.0),
    );

    screen.load_services(&api).await;
    screen.locate(&geolocation, &api).await;
    if !cli.services.is_empty() {
        let filter: ServiceFilterSet = cli.services.iter().map(String::as_str).collect();
        screen.set_service_filter(filter);
    }

    let composition = screen.compose();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&composition)?);
    } else {
        match &composition {
            Composition::SideBySide { sidebar, .. } => {
                println!("🖥️  Side-by-side layout");
                print_content(sidebar);
            }
            Composition::Stacked { overlay, .. } => {
                println!(
                    "📱 Stacked layout, panel {} at {:.0}px",
                    overlay.panel_state, overlay.height
                );
                print_content(&overlay.content);
            }
        }
    }

    // 有通知代表顯示的是舊資料或空資料，以可重試的退出碼結束
    if let Some(notice) = screen.search().notice() {
        tracing::warn!("Finished with notice: {}", notice.message);
        std::process::exit(2);
    }

    Ok(())
}
