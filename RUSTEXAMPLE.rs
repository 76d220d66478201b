use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use escrow_client::escrow::{escrow_error_message, EscrowDraft, EscrowFilter, SellerRef};
use escrow_client::session::FileStorage;
use escrow_client::{ClientOptions, Session, SessionState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Replace with the address of your deployment.
    let options = ClientOptions::new("http://localhost:8080/api");
    let session = Session::builder(options)
        .with_storage(Arc::new(FileStorage::new("escrow-session.json")))
        .build()?;

    session.on_state_changed(|state| println!("session state: {state:?}"));

    let profile = match session.initialize().await {
        SessionState::Authenticated(profile) => profile,
        other => {
            println!("not signed in ({other:?}); sign in through the web app first");
            return Ok(());
        }
    };
    println!("signed in as {}", profile.display_name_or("User"));

    let dashboard = session.api().dashboard().await?;
    println!(
        "{} escrows, {} active, {:.2} ETB in total",
        dashboard.summary.total, dashboard.summary.active, dashboard.summary.total_amount
    );

    let list = session.api().list_my_escrows().await?;
    let filter = EscrowFilter {
        search: "laptop".into(),
        status: None,
    };
    for escrow in filter.apply(&list.escrows) {
        println!("- #{} {:?} {:.2}", escrow.id, escrow.status, escrow.amount);
    }

    let draft = EscrowDraft {
        seller: Some(SellerRef {
            id: 7,
            name: "Sara".into(),
            activated: Some(true),
        }),
        amount: Some(1_200.0),
        item_description: Some("Used laptop".into()),
        inspection_period_days: Some(3),
        ..Default::default()
    };
    match session.api().submit_escrow_draft(&draft, &profile).await {
        Ok(escrow) => println!("created escrow #{}", escrow.id),
        Err(err) => println!("could not create escrow: {}", escrow_error_message(&err)),
    }

    // Give the notification socket a moment to deliver history.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let store = session.notifications();
    println!("{} notifications, {} unread", store.len(), store.unread_count());

    session.dispose();
    Ok(())
}
