//! Typed Azure resource declarations.
//!
//! Args structs are the inputs a declaration supplies; handle structs are
//! what a declaration returns — the node in the stack graph plus the
//! outputs the provider produces at apply time.

use std::path::PathBuf;

use chrono::NaiveDate;
use petgraph::graph::NodeIndex;

use super::output::Output;
use crate::config::Secret;

/// Resource record types, named by the provider's type tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ResourceGroup,
    StorageAccount,
    StaticWebsite,
    SyncedFolder,
    BlobContainer,
    Blob,
    ServiceSas,
    AppServicePlan,
    FunctionApp,
    ApiManagementService,
    Api,
    Product,
    ProductApi,
}

impl ResourceKind {
    pub fn type_token(&self) -> &'static str {
        match self {
            ResourceKind::ResourceGroup => "azure-native:resources:ResourceGroup",
            ResourceKind::StorageAccount => "azure-native:storage:StorageAccount",
            ResourceKind::StaticWebsite => "azure-native:storage:StorageAccountStaticWebsite",
            ResourceKind::SyncedFolder => "synced-folder:index:AzureBlobFolder",
            ResourceKind::BlobContainer => "azure-native:storage:BlobContainer",
            ResourceKind::Blob => "azure-native:storage:Blob",
            ResourceKind::ServiceSas => "azure-native:storage:ServiceSasToken",
            ResourceKind::AppServicePlan => "azure-native:web:AppServicePlan",
            ResourceKind::FunctionApp => "azure-native:web:WebApp",
            ResourceKind::ApiManagementService => {
                "azure-native:apimanagement:ApiManagementService"
            }
            ResourceKind::Api => "azure-native:apimanagement:Api",
            ResourceKind::Product => "azure-native:apimanagement:Product",
            ResourceKind::ProductApi => "azure-native:apimanagement:ProductApi",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageAccountArgs {
    pub kind: String,
    pub sku_name: String,
}

impl Default for StorageAccountArgs {
    fn default() -> Self {
        Self {
            kind: "StorageV2".to_string(),
            sku_name: "Standard_LRS".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticWebsiteArgs {
    pub index_document: String,
    pub error404_document: String,
}

#[derive(Debug, Clone)]
pub struct SyncedFolderArgs {
    /// Local directory mirrored into the container; one-way,
    /// last-write-wins.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAccess {
    None,
    Blob,
    Container,
}

impl PublicAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicAccess::None => "None",
            PublicAccess::Blob => "Blob",
            PublicAccess::Container => "Container",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlobContainerArgs {
    pub public_access: PublicAccess,
}

#[derive(Debug, Clone)]
pub struct BlobArgs {
    /// Local path packaged as the uploaded archive.
    pub source: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServiceSasArgs {
    pub protocols: String,
    pub start: NaiveDate,
    pub expiry: NaiveDate,
    /// Scope of the signature: "b" = a single blob.
    pub resource: String,
    pub permissions: String,
}

impl Default for ServiceSasArgs {
    fn default() -> Self {
        Self {
            protocols: "https".to_string(),
            // The signature outlives any sane rotation policy; the deployed
            // stack has always shipped this window, so it stays as-is.
            start: NaiveDate::from_ymd_opt(2022, 1, 1).expect("valid date"),
            expiry: NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date"),
            resource: "b".to_string(),
            permissions: "r".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppServicePlanArgs {
    pub kind: String,
    pub reserved: bool,
    pub sku_name: String,
    pub sku_tier: String,
}

impl Default for AppServicePlanArgs {
    fn default() -> Self {
        Self {
            kind: "Linux".to_string(),
            reserved: true,
            sku_name: "Y1".to_string(),
            sku_tier: "Dynamic".to_string(),
        }
    }
}

/// One app setting. Order matters and duplicate names are not deduplicated
/// here; last-applied-wins is the provider's behavior.
#[derive(Clone)]
pub struct NameValuePair {
    pub name: String,
    pub value: SettingValue,
}

#[derive(Clone)]
pub enum SettingValue {
    Literal(String),
    Secret(Secret),
    /// Derived from other resources' outputs; unknown until apply.
    Computed(Output<String>),
}

impl NameValuePair {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SettingValue::Literal(value.into()),
        }
    }

    pub fn secret(name: impl Into<String>, value: Secret) -> Self {
        Self {
            name: name.into(),
            value: SettingValue::Secret(value),
        }
    }

    pub fn computed(name: impl Into<String>, value: Output<String>) -> Self {
        Self {
            name: name.into(),
            value: SettingValue::Computed(value),
        }
    }

    /// The setting value as an output, whatever its flavor.
    pub fn output(&self) -> Output<String> {
        match &self.value {
            SettingValue::Literal(text) => Output::resolved(text.clone()),
            SettingValue::Secret(secret) => Output::resolved(secret.expose().to_string()),
            SettingValue::Computed(output) => output.clone(),
        }
    }

    pub(super) fn deps(&self) -> &[NodeIndex] {
        match &self.value {
            SettingValue::Computed(output) => output.deps(),
            _ => &[],
        }
    }

    /// How the value appears in plan output; secrets and unresolved
    /// computations never print.
    pub(super) fn display_value(&self) -> String {
        match &self.value {
            SettingValue::Literal(text) => text.clone(),
            SettingValue::Secret(_) => "****".to_string(),
            SettingValue::Computed(_) => "<computed>".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionAppArgs {
    pub kind: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for FunctionAppArgs {
    fn default() -> Self {
        Self {
            kind: "FunctionApp".to_string(),
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiManagementServiceArgs {
    pub publisher_email: String,
    pub publisher_name: String,
    pub sku_name: String,
    pub sku_capacity: u32,
    pub enable_client_certificate: bool,
}

impl Default for ApiManagementServiceArgs {
    fn default() -> Self {
        Self {
            publisher_email: "emcee@mlapps.com".to_string(),
            publisher_name: "mlapps".to_string(),
            sku_name: "Developer".to_string(),
            sku_capacity: 1,
            enable_client_certificate: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiArgs {
    pub display_name: String,
    pub path: String,
    pub protocols: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProductArgs {
    pub product_id: String,
}

// Handles returned by declarations. Each carries its node in the stack
// graph and the outputs dependents may consume.

pub struct ResourceGroup {
    pub(super) node: NodeIndex,
    pub name: Output<String>,
}

pub struct StorageAccount {
    pub(super) node: NodeIndex,
    pub name: Output<String>,
    pub primary_key: Output<String>,
    /// Static-website endpoint (`https://<account>.web.core.windows.net/`).
    pub primary_web_endpoint: Output<String>,
}

pub struct StaticWebsite {
    pub(super) node: NodeIndex,
    pub container_name: Output<String>,
}

pub struct SyncedFolder {
    #[allow(dead_code)]
    pub(super) node: NodeIndex,
}

pub struct BlobContainer {
    pub(super) node: NodeIndex,
    pub name: Output<String>,
}

pub struct Blob {
    pub(super) node: NodeIndex,
    pub name: Output<String>,
}

pub struct ServiceSas {
    pub(super) node: NodeIndex,
    pub token: Output<String>,
}

pub struct AppServicePlan {
    pub(super) node: NodeIndex,
    pub id: Output<String>,
}

pub struct FunctionApp {
    #[allow(dead_code)]
    pub(super) node: NodeIndex,
}

pub struct ApiManagementService {
    pub(super) node: NodeIndex,
    pub name: Output<String>,
    pub gateway_url: Output<String>,
}

pub struct Api {
    pub(super) node: NodeIndex,
    pub api_id: Output<String>,
}

pub struct Product {
    pub(super) node: NodeIndex,
    pub product_id: Output<String>,
}

pub struct ProductApi {
    #[allow(dead_code)]
    pub(super) node: NodeIndex,
}
