use resource_store::backend;
use resource_store::client::ApiError;
use resource_store::lifecycle::{setup_tracing, MemoryServer};
use resource_store::model::{Filter, NewResource, ParentKey, QueryOptions, Resource};
use serde_json::json;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting demo against in-memory backends");

    let mut server = MemoryServer::new();

    // Widgets reject blank titles, like a typical server-side validation.
    let (widget_backend, widget_client) = backend::new("widgets");
    let widget_backend = widget_backend
        .with_resources(vec![
            Resource::new("widgets", "100")
                .with_attribute("title", "Seeded")
                .with_attribute("status", "published")
                .with_relationship("owner", json!({ "data": { "type": "users", "id": "1" } })),
        ])
        .with_validator(|resource| match resource.attributes.get("title") {
            Some(title) if title != "" => Ok(()),
            _ => Err(vec![ApiError::new("422", "can't be blank").with_attribute_pointer("title")]),
        });
    server.register(widget_backend, widget_client);

    let users = server.store("users");
    let widgets = server.store("widgets");

    let span = tracing::info_span!("seeding");
    let alice = async {
        info!("Creating user");
        users
            .create(NewResource::new("users").with_attribute("name", "Alice"))
            .await
    }
    .instrument(span)
    .await?;
    info!(user_id = %alice.id(), "User created");

    for title in ["Foo", "Bar"] {
        widgets
            .create(
                NewResource::new("widgets")
                    .with_attribute("title", title)
                    .with_attribute("status", "draft")
                    .with_relationship("owner", json!({ "data": { "type": "users", "id": alice.id() } })),
            )
            .await?;
    }

    let drafts = Filter::new().with("status", "draft");
    widgets.load_where(drafts.clone(), QueryOptions::new().include("owner")).await?;
    widgets.load_related(ParentKey::new("users", alice.id()), QueryOptions::new()).await?;
    widgets.load_all(QueryOptions::new()).await?;
    info!(
        all = widgets.all().len(),
        drafts = widgets.where_(&drafts).len(),
        owned_by_alice = widgets.related(&ParentKey::new("users", alice.id())).len(),
        "Loaded widgets"
    );

    // Publish the first draft
    if let Some(first) = widgets.where_(&drafts).first() {
        first.set_attribute("status", "published");
        first.save().await?;
    }

    // A blank title is rejected and reported, not swallowed
    if let Some(seeded) = widgets.by_id("100") {
        seeded.set_attribute("title", "");
        match seeded.save().await {
            Ok(_) => info!("Blank title accepted"),
            Err(e) => error!(error = %e, "Save rejected"),
        }
        seeded.delete().await?;
    }
    info!(remaining = widgets.all().len(), "Done");

    server.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
