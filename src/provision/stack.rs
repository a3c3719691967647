//! The resource dependency graph.
//!
//! `Stack::declare` is a single linear pass: each declaration adds a typed
//! node to a petgraph `DiGraph` and every consumed [`Output`] adds an edge
//! from its producer. The external engine walks the declared graph; this
//! code never orders, retries or applies anything itself.

use std::collections::HashMap;
use std::fmt::Write as _;

use petgraph::algo::{has_path_connecting, is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use super::config::StackConfig;
use super::output::{join2, join4, Output, Resolver};
use super::resources::{
    Api, ApiArgs, ApiManagementService, ApiManagementServiceArgs, AppServicePlan,
    AppServicePlanArgs, Blob, BlobArgs, BlobContainer, BlobContainerArgs, FunctionApp,
    FunctionAppArgs, NameValuePair, Product, ProductApi, ProductArgs, ResourceGroup,
    ResourceKind, ServiceSas, ServiceSasArgs, StaticWebsite, StaticWebsiteArgs, StorageAccount,
    StorageAccountArgs, SyncedFolder, SyncedFolderArgs,
};

/// A declared resource: its type, logical name, and the inputs it was given
/// (already rendered for plan output).
pub struct ResourceNode {
    pub name: String,
    pub kind: ResourceKind,
    pub inputs: Vec<InputSpec>,
}

pub struct InputSpec {
    pub name: String,
    pub value: String,
}

impl InputSpec {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub struct Stack {
    graph: DiGraph<ResourceNode, ()>,
    indices: HashMap<String, NodeIndex>,
    resolvers: HashMap<String, Resolver<String>>,
    app_settings: HashMap<String, Vec<NameValuePair>>,
    exports: Vec<(String, Output<String>)>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            indices: HashMap::new(),
            resolvers: HashMap::new(),
            app_settings: HashMap::new(),
            exports: Vec::new(),
        }
    }

    /// Declares the whole deployment: static website, packaged function app
    /// with SAS-qualified package URL, and the API Management facade.
    /// Mirrors the order the resources were first written in.
    pub fn declare(config: &StackConfig) -> Self {
        let mut stack = Stack::new();

        let resource_group = stack.resource_group("resource-group");

        let account = stack.storage_account(
            "account",
            &resource_group,
            StorageAccountArgs::default(),
        );

        let website = stack.static_website(
            "website",
            &resource_group,
            &account,
            StaticWebsiteArgs {
                index_document: config.index_document.clone(),
                error404_document: config.error_document.clone(),
            },
        );

        let _synced_folder = stack.synced_folder(
            "synced-folder",
            &resource_group,
            &account,
            &website,
            SyncedFolderArgs {
                path: config.site_path.clone(),
            },
        );

        let app_container = stack.blob_container(
            "app-container",
            &resource_group,
            &account,
            BlobContainerArgs {
                public_access: super::resources::PublicAccess::None,
            },
        );

        let app_blob = stack.blob(
            "app-blob",
            &resource_group,
            &account,
            &app_container,
            BlobArgs {
                source: config.app_path.clone(),
            },
        );

        let sas = stack.service_sas(
            "sas",
            &resource_group,
            &account,
            &app_container,
            &app_blob,
            ServiceSasArgs::default(),
        );

        let plan = stack.app_service_plan("plan", &resource_group, AppServicePlanArgs::default());

        // The package pointer joins four apply-time values; it is only valid
        // once all four have resolved, and recomputes if any of them change.
        let package_url = join4(&account.name, &app_container.name, &app_blob.name, &sas.token)
            .map(|(account, container, blob, token)| {
                format!(
                    "https://{}.blob.core.windows.net/{}/{}?{}",
                    account, container, blob, token
                )
            });

        let storage_connection = join2(&account.name, &account.primary_key).map(
            |(account, key)| {
                format!(
                    "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix=core.windows.net",
                    account, key
                )
            },
        );

        let app_settings = vec![
            NameValuePair::literal("FUNCTIONS_WORKER_RUNTIME", "custom"),
            NameValuePair::literal("FUNCTIONS_EXTENSION_VERSION", "~4"),
            NameValuePair::computed("WEBSITE_RUN_FROM_PACKAGE", package_url),
            NameValuePair::secret("OPENAI_API_KEY", config.openai_token.clone()),
            NameValuePair::computed("AzureWebJobsStorage", storage_connection),
        ];

        let _app = stack.function_app(
            "app",
            &resource_group,
            &plan,
            app_settings,
            FunctionAppArgs::default(),
        );

        let api_management = stack.api_management_service(
            "api-management-service",
            &resource_group,
            ApiManagementServiceArgs::default(),
        );

        let api = stack.api(
            "api-management-api",
            &resource_group,
            &api_management,
            ApiArgs {
                display_name: "API Management API".to_string(),
                path: "api".to_string(),
                protocols: vec!["https".to_string()],
            },
        );

        let product = stack.product(
            "product",
            &resource_group,
            &api_management,
            ProductArgs {
                product_id: "unlimited".to_string(),
            },
        );

        let _product_api =
            stack.product_api("product-api", &resource_group, &api_management, &api, &product);

        stack.export("siteURL", account.primary_web_endpoint.clone());
        stack.export("apiManagementURL", api_management.gateway_url.clone());

        stack
    }

    pub fn resource_group(&mut self, name: &str) -> ResourceGroup {
        let node = self.add_node(ResourceKind::ResourceGroup, name, Vec::new());
        ResourceGroup {
            node,
            name: self.attr(node, name, "name"),
        }
    }

    pub fn storage_account(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        args: StorageAccountArgs,
    ) -> StorageAccount {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("kind", args.kind),
            InputSpec::new("sku", args.sku_name),
        ];
        let node = self.add_node(ResourceKind::StorageAccount, name, inputs);
        self.depend(node, &[group.node]);
        StorageAccount {
            node,
            name: self.attr(node, name, "name"),
            primary_key: self.attr(node, name, "primary_key"),
            primary_web_endpoint: self.attr(node, name, "primary_web_endpoint"),
        }
    }

    pub fn static_website(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        account: &StorageAccount,
        args: StaticWebsiteArgs,
    ) -> StaticWebsite {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("account_name", self.ref_to(account.node, "name")),
            InputSpec::new("index_document", args.index_document),
            InputSpec::new("error404_document", args.error404_document),
        ];
        let node = self.add_node(ResourceKind::StaticWebsite, name, inputs);
        self.depend(node, &[group.node, account.node]);
        StaticWebsite {
            node,
            container_name: self.attr(node, name, "container_name"),
        }
    }

    pub fn synced_folder(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        account: &StorageAccount,
        website: &StaticWebsite,
        args: SyncedFolderArgs,
    ) -> SyncedFolder {
        let inputs = vec![
            InputSpec::new("path", args.path.display().to_string()),
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("storage_account_name", self.ref_to(account.node, "name")),
            InputSpec::new(
                "container_name",
                self.ref_to(website.node, "container_name"),
            ),
        ];
        let node = self.add_node(ResourceKind::SyncedFolder, name, inputs);
        self.depend(node, &[group.node, account.node, website.node]);
        SyncedFolder { node }
    }

    pub fn blob_container(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        account: &StorageAccount,
        args: BlobContainerArgs,
    ) -> BlobContainer {
        let inputs = vec![
            InputSpec::new("account_name", self.ref_to(account.node, "name")),
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("public_access", args.public_access.as_str()),
        ];
        let node = self.add_node(ResourceKind::BlobContainer, name, inputs);
        self.depend(node, &[group.node, account.node]);
        BlobContainer {
            node,
            name: self.attr(node, name, "name"),
        }
    }

    pub fn blob(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        account: &StorageAccount,
        container: &BlobContainer,
        args: BlobArgs,
    ) -> Blob {
        let inputs = vec![
            InputSpec::new("account_name", self.ref_to(account.node, "name")),
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("container_name", self.ref_to(container.node, "name")),
            InputSpec::new("source", args.source.display().to_string()),
        ];
        let node = self.add_node(ResourceKind::Blob, name, inputs);
        self.depend(node, &[group.node, account.node, container.node]);
        Blob {
            node,
            name: self.attr(node, name, "name"),
        }
    }

    /// The SAS computation is an apply-time join over the account, container
    /// and blob; none of its inputs exist before those resources resolve.
    pub fn service_sas(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        account: &StorageAccount,
        container: &BlobContainer,
        blob: &Blob,
        args: ServiceSasArgs,
    ) -> ServiceSas {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("account_name", self.ref_to(account.node, "name")),
            InputSpec::new("protocols", args.protocols),
            InputSpec::new("shared_access_start_time", args.start.to_string()),
            InputSpec::new("shared_access_expiry_time", args.expiry.to_string()),
            InputSpec::new("resource", args.resource),
            InputSpec::new("permissions", args.permissions),
            InputSpec::new("canonicalized_resource", "<computed>"),
        ];
        let node = self.add_node(ResourceKind::ServiceSas, name, inputs);
        self.depend(node, &[group.node, account.node, container.node, blob.node]);
        ServiceSas {
            node,
            token: self.attr(node, name, "service_sas_token"),
        }
    }

    pub fn app_service_plan(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        args: AppServicePlanArgs,
    ) -> AppServicePlan {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("kind", args.kind),
            InputSpec::new("reserved", args.reserved.to_string()),
            InputSpec::new("sku", format!("{}/{}", args.sku_name, args.sku_tier)),
        ];
        let node = self.add_node(ResourceKind::AppServicePlan, name, inputs);
        self.depend(node, &[group.node]);
        AppServicePlan {
            node,
            id: self.attr(node, name, "id"),
        }
    }

    pub fn function_app(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        plan: &AppServicePlan,
        app_settings: Vec<NameValuePair>,
        args: FunctionAppArgs,
    ) -> FunctionApp {
        let mut inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("server_farm_id", self.ref_to(plan.node, "id")),
            InputSpec::new("kind", args.kind),
            InputSpec::new(
                "cors_allowed_origins",
                args.cors_allowed_origins.join(", "),
            ),
        ];
        let mut setting_deps: Vec<NodeIndex> = vec![group.node, plan.node];
        for setting in &app_settings {
            inputs.push(InputSpec::new(
                format!("app_settings.{}", setting.name),
                setting.display_value(),
            ));
            for dep in setting.deps() {
                if !setting_deps.contains(dep) {
                    setting_deps.push(*dep);
                }
            }
        }
        let node = self.add_node(ResourceKind::FunctionApp, name, inputs);
        self.depend(node, &setting_deps);
        self.app_settings.insert(name.to_string(), app_settings);
        FunctionApp { node }
    }

    /// The composed settings declared for a function app, in declaration
    /// order. The engine reads the setting outputs from here once the
    /// upstream resources have resolved.
    pub fn app_settings(&self, app: &str) -> Option<&[NameValuePair]> {
        self.app_settings.get(app).map(|settings| settings.as_slice())
    }

    pub fn api_management_service(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        args: ApiManagementServiceArgs,
    ) -> ApiManagementService {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("publisher_email", args.publisher_email),
            InputSpec::new("publisher_name", args.publisher_name),
            InputSpec::new(
                "sku",
                format!("{}/{}", args.sku_name, args.sku_capacity),
            ),
            InputSpec::new(
                "enable_client_certificate",
                args.enable_client_certificate.to_string(),
            ),
        ];
        let node = self.add_node(ResourceKind::ApiManagementService, name, inputs);
        self.depend(node, &[group.node]);
        ApiManagementService {
            node,
            name: self.attr(node, name, "name"),
            gateway_url: self.attr(node, name, "gateway_url"),
        }
    }

    pub fn api(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        service: &ApiManagementService,
        args: ApiArgs,
    ) -> Api {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("service_name", self.ref_to(service.node, "name")),
            InputSpec::new("display_name", args.display_name),
            InputSpec::new("path", args.path),
            InputSpec::new("protocols", args.protocols.join(", ")),
        ];
        let node = self.add_node(ResourceKind::Api, name, inputs);
        self.depend(node, &[group.node, service.node]);
        Api {
            node,
            api_id: self.attr(node, name, "api_id"),
        }
    }

    pub fn product(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        service: &ApiManagementService,
        args: ProductArgs,
    ) -> Product {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("service_name", self.ref_to(service.node, "name")),
            InputSpec::new("product_id", args.product_id.clone()),
            InputSpec::new("display_name", self.ref_to(service.node, "name")),
        ];
        let node = self.add_node(ResourceKind::Product, name, inputs);
        self.depend(node, &[group.node, service.node]);
        Product {
            node,
            product_id: Output::resolved(args.product_id).with_deps(vec![node]),
        }
    }

    pub fn product_api(
        &mut self,
        name: &str,
        group: &ResourceGroup,
        service: &ApiManagementService,
        api: &Api,
        product: &Product,
    ) -> ProductApi {
        let inputs = vec![
            InputSpec::new("resource_group_name", self.ref_to(group.node, "name")),
            InputSpec::new("service_name", self.ref_to(service.node, "name")),
            InputSpec::new("api_id", self.ref_to(api.node, "api_id")),
            InputSpec::new("product_id", self.ref_to(product.node, "product_id")),
        ];
        let node = self.add_node(ResourceKind::ProductApi, name, inputs);
        self.depend(node, &[group.node, service.node, api.node, product.node]);
        ProductApi { node }
    }

    /// Registers a stack export. Exports resolve along with the resources
    /// they reference.
    pub fn export(&mut self, name: impl Into<String>, output: Output<String>) {
        self.exports.push((name.into(), output));
    }

    pub fn exports(&self) -> &[(String, Output<String>)] {
        &self.exports
    }

    /// Resolves one pending output attribute (`"resource.attr"`). Returns
    /// false if the key is unknown or already resolved. Called by whatever
    /// drives the stack: the engine adapter in production, stubs in tests.
    pub fn resolve(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.resolvers.remove(key) {
            Some(resolver) => {
                resolver.resolve(value.into());
                true
            }
            None => false,
        }
    }

    /// Attribute keys still waiting on the engine.
    pub fn pending_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.resolvers.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn resource_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// True if `consumer` transitively depends on `producer`.
    pub fn depends_on(&self, consumer: &str, producer: &str) -> bool {
        let (Some(&consumer), Some(&producer)) =
            (self.indices.get(consumer), self.indices.get(producer))
        else {
            return false;
        };
        has_path_connecting(&self.graph, producer, consumer, None)
    }

    /// Renders the declared resources in dependency order, with their
    /// inputs. Unresolved values print symbolically.
    pub fn render_plan(&self) -> String {
        let order = match toposort(&self.graph, None) {
            Ok(order) => order,
            // Declarations can only reference earlier resources, so a cycle
            // cannot arise; fall back to insertion order if it ever does.
            Err(_) => self.graph.node_indices().collect(),
        };

        let mut out = String::new();
        for idx in order {
            let Some(node) = self.graph.node_weight(idx) else {
                continue;
            };
            let _ = writeln!(out, "{}  {}", node.kind.type_token(), node.name);
            for input in &node.inputs {
                let _ = writeln!(out, "    {} = {}", input.name, input.value);
            }
        }
        out
    }

    fn add_node(
        &mut self,
        kind: ResourceKind,
        name: &str,
        inputs: Vec<InputSpec>,
    ) -> NodeIndex {
        let node = self.graph.add_node(ResourceNode {
            name: name.to_string(),
            kind,
            inputs,
        });
        self.indices.insert(name.to_string(), node);
        node
    }

    fn attr(&mut self, node: NodeIndex, resource: &str, attr: &str) -> Output<String> {
        let key = format!("{}.{}", resource, attr);
        let (resolver, output) = Output::pending(key.clone());
        self.resolvers.insert(key, resolver);
        output.with_deps(vec![node])
    }

    fn depend(&mut self, node: NodeIndex, producers: &[NodeIndex]) {
        for producer in producers {
            if *producer != node {
                self.graph.update_edge(*producer, node, ());
            }
        }
    }

    fn ref_to(&self, node: NodeIndex, attr: &str) -> String {
        let name = self
            .graph
            .node_weight(node)
            .map(|weight| weight.name.as_str())
            .unwrap_or("unknown");
        format!("${{{}.{}}}", name, attr)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn test_config() -> StackConfig {
        StackConfig {
            site_path: "./www".into(),
            app_path: "./app".into(),
            index_document: "index.html".to_string(),
            error_document: "error.html".to_string(),
            openai_token: Secret::new("sk-test"),
        }
    }

    #[test]
    fn declared_stack_is_acyclic_and_complete() {
        let stack = Stack::declare(&test_config());
        assert_eq!(stack.resource_count(), 13);
        assert!(!stack.has_cycle());
    }

    #[test]
    fn function_app_depends_on_package_chain() {
        let stack = Stack::declare(&test_config());
        assert!(stack.depends_on("app", "account"));
        assert!(stack.depends_on("app", "app-container"));
        assert!(stack.depends_on("app", "app-blob"));
        assert!(stack.depends_on("app", "sas"));
        assert!(stack.depends_on("app", "plan"));
        // The gateway facade is parallel to the function app.
        assert!(!stack.depends_on("app", "api-management-service"));
    }

    #[test]
    fn sas_depends_on_account_container_and_blob() {
        let stack = Stack::declare(&test_config());
        assert!(stack.depends_on("sas", "account"));
        assert!(stack.depends_on("sas", "app-container"));
        assert!(stack.depends_on("sas", "app-blob"));
    }

    #[test]
    fn synced_folder_depends_on_website_container() {
        let stack = Stack::declare(&test_config());
        assert!(stack.depends_on("synced-folder", "website"));
        assert!(stack.depends_on("synced-folder", "account"));
    }

    #[test]
    fn plan_renders_secrets_redacted() {
        let stack = Stack::declare(&test_config());
        let plan = stack.render_plan();
        assert!(plan.contains("azure-native:web:WebApp  app"));
        assert!(plan.contains("app_settings.OPENAI_API_KEY = ****"));
        assert!(!plan.contains("sk-test"));
        // Group first, bindings last.
        let group_pos = plan.find("ResourceGroup").unwrap();
        let binding_pos = plan.find("ProductApi").unwrap();
        assert!(group_pos < binding_pos);
    }
}
