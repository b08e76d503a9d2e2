use listmind::models::{Category, Item};
use listmind::state::AppState;
use listmind::view::{Row, ViewProjector};
use tracing::info;

/// Demo walkthrough against the local stack: seed the demo account, create a
/// list, add an item, mark it purchased and log the grouped view after each
/// step.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "listmind=debug".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init()?;
    state.auth.ensure_demo_user()?;
    state.auth.sign_in("demo@demo.com", "demo1234")?;

    let lists = state.repos.list_repository();
    let items = state.repos.item_repository();

    let lists_projector = ViewProjector::lists(lists.observe_lists());
    let mut lists_state = lists_projector.state();

    let groceries = lists.create("Groceries", None).await?;
    {
        let seen = lists_state.wait_for(|s| !s.all.is_empty()).await?;
        info!(
            lists = seen.all.len(),
            title = %seen.all[0].title,
            items = seen.all[0].items.len(),
            "list visible on the stream"
        );
    }

    let rice = Item::new("Rice", 2.0, "kg", Category::Food);
    let rice_id = rice.id;
    items.add_item(groceries.id, rice).await?;

    let items_projector = ViewProjector::items(items.observe_items(groceries.id));
    let mut items_state = items_projector.state();
    {
        let seen = items_state.wait_for(|s| !s.all.is_empty()).await?;
        info!("grouped view:");
        log_rows(&seen.rows);
    }

    items.set_purchased(groceries.id, rice_id, true).await?;
    {
        let seen = items_state
            .wait_for(|s| s.all.iter().all(|i| i.purchased))
            .await?;
        info!("grouped view after purchase:");
        log_rows(&seen.rows);
    }

    state.auth.sign_out();
    Ok(())
}

fn log_rows(rows: &[Row]) {
    for row in rows {
        match row {
            Row::Header(section) => info!("[{}]", section.label()),
            Row::Item(item) => info!("  {} ({} {})", item.name, item.quantity, item.unit),
        }
    }
}
