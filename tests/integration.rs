//! Integration tests for proctor
//!
//! These require a running Chrome with remote debugging enabled and its
//! browser WebSocket endpoint in the CHROME_WS environment variable:
//!
//! ```sh
//! chrome --headless --remote-debugging-port=9222 &
//! export CHROME_WS=$(curl -s http://127.0.0.1:9222/json/version \
//!     | sed -n 's/.*"webSocketDebuggerUrl": *"\([^"]*\)".*/\1/p')
//! cargo test --test integration -- --ignored
//! ```

use proctor::{dispatch_on_element, Connection, Error, Page};

fn chrome_ws() -> Option<String> {
    std::env::var("CHROME_WS").ok()
}

async fn open(connection: &Connection, html: &str) -> Page {
    let page = connection
        .open_page(&format!("data:text/html,{html}"))
        .await
        .expect("Failed to open page");
    page.wait_for_ready(10_000).await.expect("Page not ready");
    page
}

async fn close(connection: &Connection, page: &Page) {
    connection
        .close_target(page.session().target_id())
        .await
        .expect("Failed to close target");
}

#[tokio::test]
#[ignore = "requires a running Chrome and CHROME_WS"]
async fn connect_and_version() {
    let Some(ws) = chrome_ws() else {
        eprintln!("CHROME_WS not set, skipping test");
        return;
    };

    let connection = Connection::connect(&ws).expect("Failed to connect");
    let version = connection.version().await.expect("Failed to get version");
    assert!(!version.product.is_empty());

    connection.close().await.expect("Failed to close");
}

#[tokio::test]
#[ignore = "requires a running Chrome and CHROME_WS"]
async fn set_value_round_trips_through_a_live_input() {
    let Some(ws) = chrome_ws() else {
        eprintln!("CHROME_WS not set, skipping test");
        return;
    };

    let connection = Connection::connect(&ws).expect("Failed to connect");
    let page = open(&connection, "<input id='name' value=''>").await;

    let input = page.wait_for("#name", 5_000).await.expect("Input not found");
    let text = r#"hello "world" </script>"#;
    input.set_value(text).await.expect("Failed to set value");
    assert_eq!(input.value().await.expect("Failed to get value"), text);

    close(&connection, &page).await;
    connection.close().await.expect("Failed to close");
}

#[tokio::test]
#[ignore = "requires a running Chrome and CHROME_WS"]
async fn click_updates_the_dom() {
    let Some(ws) = chrome_ws() else {
        eprintln!("CHROME_WS not set, skipping test");
        return;
    };

    let connection = Connection::connect(&ws).expect("Failed to connect");
    let page = open(
        &connection,
        "<button id='btn' onclick=\"this.textContent='Clicked!'\">Click Me</button>",
    )
    .await;

    let button = page.find("#btn").await.expect("Button not found");
    button.click().await.expect("Failed to click");

    // Give the click handler a moment to run
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(button.text().await.expect("Failed to get text"), "Clicked!");

    close(&connection, &page).await;
    connection.close().await.expect("Failed to close");
}

#[tokio::test]
#[ignore = "requires a running Chrome and CHROME_WS"]
async fn form_data_collects_named_fields() {
    let Some(ws) = chrome_ws() else {
        eprintln!("CHROME_WS not set, skipping test");
        return;
    };

    let connection = Connection::connect(&ws).expect("Failed to connect");
    let page = open(
        &connection,
        "<form id='f'><input name='user' value='ada'><input name='city' value='london'></form>",
    )
    .await;

    let form = page.find("#f").await.expect("Form not found");
    let data = form.form_data().await.expect("Failed to extract form data");
    assert_eq!(data.get("user").map(String::as_str), Some("ada"));
    assert_eq!(data.get("city").map(String::as_str), Some("london"));

    close(&connection, &page).await;
    connection.close().await.expect("Failed to close");
}

#[tokio::test]
#[ignore = "requires a running Chrome and CHROME_WS"]
async fn page_operations_report_live_state() {
    let Some(ws) = chrome_ws() else {
        eprintln!("CHROME_WS not set, skipping test");
        return;
    };

    let connection = Connection::connect(&ws).expect("Failed to connect");
    let page = open(&connection, "<div style='height:5000px'>tall</div>").await;

    assert_eq!(page.ready_state().await.expect("readyState"), "complete");

    let viewport = page.viewport_size().await.expect("viewport");
    assert!(viewport.width > 0 && viewport.height > 0);

    page.scroll_to(0.0, 400.0).await.expect("scroll");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let position = page.scroll_position().await.expect("scroll position");
    assert!(position.y > 0.0);

    close(&connection, &page).await;
    connection.close().await.expect("Failed to close");
}

#[tokio::test]
#[ignore = "requires a running Chrome and CHROME_WS"]
async fn unknown_operation_is_rejected_even_with_a_live_session() {
    let Some(ws) = chrome_ws() else {
        eprintln!("CHROME_WS not set, skipping test");
        return;
    };

    let connection = Connection::connect(&ws).expect("Failed to connect");
    let page = open(&connection, "<div id='d'>x</div>").await;

    let element = page.find("#d").await.expect("Element not found");
    let err = dispatch_on_element(page.session(), element.node_id(), "deleteDatabase", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownOperation { .. }));

    close(&connection, &page).await;
    connection.close().await.expect("Failed to close");
}
