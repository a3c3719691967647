//! Stack declaration tests: credential derivation, package-URL composition
//! and export wiring, with resource outputs resolved by stubs the way the
//! engine would resolve them after apply.

use askdocs::config::Secret;
use askdocs::provision::{OutputError, Stack, StackConfig};

fn config() -> StackConfig {
    StackConfig {
        site_path: "./www".into(),
        app_path: "./app".into(),
        index_document: "index.html".to_string(),
        error_document: "error.html".to_string(),
        openai_token: Secret::new("sk-stack-test"),
    }
}

fn resolve_storage_chain(stack: &mut Stack) {
    assert!(stack.resolve("account.name", "storacct1a2b"));
    assert!(stack.resolve("account.primary_key", "BASE64KEY=="));
    assert!(stack.resolve("app-container.name", "app-container-9f"));
    assert!(stack.resolve("app-blob.name", "app-blob-c3.zip"));
    assert!(stack.resolve("sas.service_sas_token", "sv=2022-11-02&sig=abc123"));
}

#[tokio::test]
async fn package_url_composes_in_order_once_all_inputs_resolve() {
    let mut stack = Stack::declare(&config());
    resolve_storage_chain(&mut stack);

    let settings = stack.app_settings("app").expect("app settings");
    let package = settings
        .iter()
        .find(|pair| pair.name == "WEBSITE_RUN_FROM_PACKAGE")
        .expect("package setting");

    let url = package.output().get().await.expect("resolved url");
    assert_eq!(
        url,
        "https://storacct1a2b.blob.core.windows.net/app-container-9f/app-blob-c3.zip?sv=2022-11-02&sig=abc123"
    );

    // Account, container, blob, then a non-empty SAS query, in that order.
    let account = url.find("storacct1a2b").unwrap();
    let container = url.find("app-container-9f").unwrap();
    let blob = url.find("app-blob-c3.zip").unwrap();
    let query = url.find('?').unwrap();
    assert!(account < container && container < blob && blob < query);
    assert!(!url[query + 1..].is_empty());
}

#[tokio::test]
async fn package_url_is_not_available_before_sas_resolves() {
    let mut stack = Stack::declare(&config());
    assert!(stack.resolve("account.name", "storacct1a2b"));
    assert!(stack.resolve("app-container.name", "app-container-9f"));
    assert!(stack.resolve("app-blob.name", "app-blob-c3.zip"));

    let package = stack
        .app_settings("app")
        .expect("app settings")
        .iter()
        .find(|pair| pair.name == "WEBSITE_RUN_FROM_PACKAGE")
        .expect("package setting")
        .output();

    // Dropping the stack drops the unused resolvers; the join must surface
    // the missing SAS instead of hanging.
    drop(stack);
    assert_eq!(
        package.get().await.unwrap_err(),
        OutputError::Unresolved("sas.service_sas_token".to_string())
    );
}

#[tokio::test]
async fn storage_connection_string_joins_account_name_and_key() {
    let mut stack = Stack::declare(&config());
    resolve_storage_chain(&mut stack);

    let connection = stack
        .app_settings("app")
        .expect("app settings")
        .iter()
        .find(|pair| pair.name == "AzureWebJobsStorage")
        .expect("storage setting")
        .output()
        .get()
        .await
        .expect("resolved connection string");

    assert_eq!(
        connection,
        "DefaultEndpointsProtocol=https;AccountName=storacct1a2b;AccountKey=BASE64KEY==;EndpointSuffix=core.windows.net"
    );
}

#[tokio::test]
async fn app_settings_keep_declaration_order() {
    let stack = Stack::declare(&config());
    let names: Vec<&str> = stack
        .app_settings("app")
        .expect("app settings")
        .iter()
        .map(|pair| pair.name.as_str())
        .collect();

    assert_eq!(
        names,
        [
            "FUNCTIONS_WORKER_RUNTIME",
            "FUNCTIONS_EXTENSION_VERSION",
            "WEBSITE_RUN_FROM_PACKAGE",
            "OPENAI_API_KEY",
            "AzureWebJobsStorage",
        ]
    );
}

#[tokio::test]
async fn exports_resolve_to_site_and_gateway_urls() {
    let mut stack = Stack::declare(&config());
    assert!(stack.resolve(
        "account.primary_web_endpoint",
        "https://storacct1a2b.web.core.windows.net/"
    ));
    assert!(stack.resolve(
        "api-management-service.gateway_url",
        "https://askdocs-apim.azure-api.net"
    ));

    let exports = stack.exports();
    assert_eq!(exports[0].0, "siteURL");
    assert_eq!(
        exports[0].1.get().await.unwrap(),
        "https://storacct1a2b.web.core.windows.net/"
    );
    assert_eq!(exports[1].0, "apiManagementURL");
    assert_eq!(
        exports[1].1.get().await.unwrap(),
        "https://askdocs-apim.azure-api.net"
    );
}

#[test]
fn unknown_attribute_cannot_be_resolved() {
    let mut stack = Stack::declare(&config());
    assert!(!stack.resolve("account.secondary_key", "nope"));
    // Resolving twice consumes the resolver.
    assert!(stack.resolve("account.name", "storacct"));
    assert!(!stack.resolve("account.name", "storacct-again"));
}
