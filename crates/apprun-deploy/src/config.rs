//! Builds the request documents for one deployment from the step inputs.
//!
//! Inputs are read in a fixed order and the first invalid one aborts the
//! build, so a run always reports the same error for the same inputs.

use apprun_client::model::{
    ComponentSpec, ContainerRegistry, CreateApplicationRequest, DeploySource, EnvVar,
    HttpGetProbe, PacketFilter, PacketFilterSetting, PatchApplicationRequest, Probe, ProbeHeader,
};
use apprun_client::{AccessKey, ApplicationDirectory};
use ipnetwork::IpNetwork;

use crate::block_map;
use crate::error::ConfigError;
use crate::inputs::{Inputs, Trim};

pub const DEFAULT_TIMEOUT_SECONDS: i64 = 30;
pub const DEFAULT_PORT: i64 = 80;
pub const DEFAULT_MIN_SCALE: i64 = 0;
pub const DEFAULT_MAX_SCALE: i64 = 10;
pub const DEFAULT_MAX_CPU: &str = "0.1";
pub const DEFAULT_MAX_MEMORY: &str = "256Mi";

pub const MAX_CPU_VALUES: [&str; 10] = [
    "0.1", "0.2", "0.3", "0.4", "0.5", "0.6", "0.7", "0.8", "0.9", "1",
];
pub const MAX_MEMORY_VALUES: [&str; 4] = ["256Mi", "512Mi", "1Gi", "2Gi"];

/// Everything one run sends to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub request: ApplicationRequest,
    pub packet_filter: PacketFilter,
    /// Replace the component env with the live application's env before
    /// patching.
    pub inherit_env: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationRequest {
    /// No application with the requested name exists yet.
    Create(CreateApplicationRequest),
    /// The name resolved to an existing application id.
    Patch(PatchApplicationRequest),
}

pub fn load_access_key(inputs: &Inputs<'_>) -> Result<AccessKey, ConfigError> {
    let token = inputs.required("access_token")?;
    let secret = inputs.required("access_secret")?;
    Ok(AccessKey::new(token, secret))
}

pub fn build_deployment(
    inputs: &Inputs<'_>,
    directory: &ApplicationDirectory,
) -> Result<Deployment, ConfigError> {
    let application_name = inputs.required("application_name")?;
    let existing_id = directory.id_of(&application_name).map(str::to_string);

    let scaling = Scaling::read(inputs)?;
    let component = ComponentInputs::read(inputs, &application_name)?;
    // inherit_env applies to a patch only
    let inherit_env = match existing_id {
        Some(_) => inputs.boolean("inherit_env", false)?,
        None => false,
    };
    let packet_filter = read_packet_filter(inputs)?;

    let request = match existing_id {
        None => ApplicationRequest::Create(CreateApplicationRequest {
            name: application_name,
            timeout_seconds: scaling.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            port: scaling.port.unwrap_or(DEFAULT_PORT),
            min_scale: scaling.min_scale.unwrap_or(DEFAULT_MIN_SCALE),
            max_scale: scaling.max_scale.unwrap_or(DEFAULT_MAX_SCALE),
            components: vec![component.into_create_spec()],
        }),
        Some(id) => ApplicationRequest::Patch(PatchApplicationRequest {
            id,
            name: Some(application_name),
            timeout_seconds: scaling.timeout_seconds,
            port: scaling.port,
            min_scale: scaling.min_scale,
            max_scale: scaling.max_scale,
            components: Some(vec![component.into_patch_spec()]),
        }),
    };

    Ok(Deployment {
        request,
        packet_filter,
        inherit_env,
    })
}

struct Scaling {
    timeout_seconds: Option<i64>,
    port: Option<i64>,
    min_scale: Option<i64>,
    max_scale: Option<i64>,
}

impl Scaling {
    fn read(inputs: &Inputs<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            timeout_seconds: inputs.optional_number("timeout_seconds")?,
            port: inputs.optional_number("port")?,
            min_scale: inputs.optional_number("min_scale")?,
            max_scale: inputs.optional_number("max_scale")?,
        })
    }
}

struct ComponentInputs {
    name: String,
    max_cpu: String,
    max_memory: String,
    registry: ContainerRegistry,
    env: Vec<EnvVar>,
    probe_target: Option<(String, i64)>,
    probe_headers: Vec<ProbeHeader>,
}

impl ComponentInputs {
    fn read(inputs: &Inputs<'_>, application_name: &str) -> Result<Self, ConfigError> {
        let image = inputs.required("image")?;
        let server = inputs.string("server", registry_host(&image));
        let username = inputs.optional("container_registry_username", Trim::Yes);
        let password = inputs.optional("container_registry_password", Trim::Yes);
        let name = inputs.string("components_name", application_name);

        let max_cpu = inputs.string("max_cpu", DEFAULT_MAX_CPU);
        let max_memory = inputs.string("max_memory", DEFAULT_MAX_MEMORY);
        if !MAX_CPU_VALUES.contains(&max_cpu.as_str())
            || !MAX_MEMORY_VALUES.contains(&max_memory.as_str())
        {
            return Err(ConfigError::invalid_resources(max_cpu, max_memory));
        }

        let env = read_pairs(inputs, "env", Trim::No)?
            .into_iter()
            .map(|(key, value)| EnvVar::new(key, value))
            .collect();

        let probe_path = inputs.optional("probe_path", Trim::Yes);
        let probe_port = inputs.optional_number("probe_port")?;
        let probe_headers = read_pairs(inputs, "probe_headers", Trim::Yes)?
            .into_iter()
            .map(|(name, value)| ProbeHeader::new(name, value))
            .collect();

        Ok(Self {
            name,
            max_cpu,
            max_memory,
            registry: ContainerRegistry {
                image,
                server: Some(server),
                username,
                password,
            },
            env,
            probe_target: probe_path.zip(probe_port),
            probe_headers,
        })
    }

    /// Empty env and header lists are left out of a create request.
    fn into_create_spec(self) -> ComponentSpec {
        let headers = non_empty(self.probe_headers);
        let env = non_empty(self.env);
        Self::component(
            self.name,
            self.max_cpu,
            self.max_memory,
            self.registry,
            env,
            self.probe_target,
            headers,
        )
    }

    /// A patch always carries both lists so an empty input clears them.
    fn into_patch_spec(self) -> ComponentSpec {
        Self::component(
            self.name,
            self.max_cpu,
            self.max_memory,
            self.registry,
            Some(self.env),
            self.probe_target,
            Some(self.probe_headers),
        )
    }

    fn component(
        name: String,
        max_cpu: String,
        max_memory: String,
        container_registry: ContainerRegistry,
        env: Option<Vec<EnvVar>>,
        probe_target: Option<(String, i64)>,
        headers: Option<Vec<ProbeHeader>>,
    ) -> ComponentSpec {
        let probe = probe_target.map(|(path, port)| Probe {
            http_get: Some(HttpGetProbe {
                path,
                port,
                headers,
            }),
        });
        ComponentSpec {
            name,
            max_cpu,
            max_memory,
            deploy_source: DeploySource { container_registry },
            env,
            probe,
        }
    }
}

/// Host part of an image reference: everything before the first `/`.
fn registry_host(image: &str) -> &str {
    image.split_once('/').map_or(image, |(host, _)| host)
}

fn read_pairs(
    inputs: &Inputs<'_>,
    key: &str,
    trim: Trim,
) -> Result<Vec<(String, String)>, ConfigError> {
    match inputs.optional(key, trim) {
        Some(text) => Ok(block_map::parse_pairs(&text)?),
        None => Ok(Vec::new()),
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn read_packet_filter(inputs: &Inputs<'_>) -> Result<PacketFilter, ConfigError> {
    let is_enabled = inputs.boolean("packet_filter_enabled", false)?;
    let settings = match inputs.optional("packet_filter_allowlist", Trim::Yes) {
        Some(text) => parse_allowlist(&text)?,
        None => Vec::new(),
    };
    Ok(PacketFilter {
        is_enabled,
        settings,
    })
}

/// One CIDR per line; blank lines are skipped. A bare address counts as a
/// single host.
pub fn parse_allowlist(text: &str) -> Result<Vec<PacketFilterSetting>, ConfigError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let network: IpNetwork = line.parse().map_err(|_| ConfigError::invalid_cidr(line))?;
            let from_ip = line.split_once('/').map_or(line, |(ip, _)| ip);
            Ok(PacketFilterSetting {
                from_ip: from_ip.to_string(),
                from_ip_prefix_length: network.prefix(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apprun_client::model::{ApplicationList, ApplicationSummary};
    use std::collections::HashMap;

    const EXISTING_ID: &str = "0e63e868-ee29-4cd2-bbd1-79f3c10d19cc";
    const IMAGE: &str = "registry.example.com/ns/app:latest";

    fn directory() -> ApplicationDirectory {
        ApplicationDirectory::from_listing(ApplicationList {
            data: vec![ApplicationSummary {
                id: EXISTING_ID.to_string(),
                name: "test-application".to_string(),
                status: "Healthy".to_string(),
                public_url: format!("{EXISTING_ID}.apprun.sakura.ne.jp"),
                created_at: None,
            }],
        })
    }

    fn store(items: &[(&str, &str)]) -> HashMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(items: &[(&str, &str)]) -> Result<Deployment, ConfigError> {
        let source = store(items);
        build_deployment(&Inputs::new(&source), &directory())
    }

    fn create(items: &[(&str, &str)]) -> CreateApplicationRequest {
        match build(items).unwrap().request {
            ApplicationRequest::Create(request) => request,
            other => panic!("expected create request, got {other:?}"),
        }
    }

    fn patch(items: &[(&str, &str)]) -> PatchApplicationRequest {
        match build(items).unwrap().request {
            ApplicationRequest::Patch(request) => request,
            other => panic!("expected patch request, got {other:?}"),
        }
    }

    fn error(items: &[(&str, &str)]) -> String {
        build(items).unwrap_err().to_string()
    }

    #[test]
    fn test_access_key_requires_both_halves() {
        let source = store(&[("access_token", "t")]);
        let err = load_access_key(&Inputs::new(&source)).unwrap_err();
        assert_eq!(err.to_string(), "access_secret is required");

        let source = store(&[("access_secret", "s")]);
        let err = load_access_key(&Inputs::new(&source)).unwrap_err();
        assert_eq!(err.to_string(), "access_token is required");

        let source = store(&[("access_token", " t "), ("access_secret", "s")]);
        assert!(load_access_key(&Inputs::new(&source)).is_ok());
    }

    #[test]
    fn test_create_defaults() {
        let request = create(&[("application_name", "new-app"), ("image", IMAGE)]);
        assert_eq!(request.name, "new-app");
        assert_eq!(request.timeout_seconds, 30);
        assert_eq!(request.port, 80);
        assert_eq!(request.min_scale, 0);
        assert_eq!(request.max_scale, 10);

        assert_eq!(request.components.len(), 1);
        let component = &request.components[0];
        assert_eq!(component.name, "new-app");
        assert_eq!(component.max_cpu, "0.1");
        assert_eq!(component.max_memory, "256Mi");
        let registry = &component.deploy_source.container_registry;
        assert_eq!(registry.image, IMAGE);
        assert_eq!(registry.server.as_deref(), Some("registry.example.com"));
        assert_eq!(registry.username, None);
        assert_eq!(registry.password, None);
        assert_eq!(component.env, None);
        assert_eq!(component.probe, None);
    }

    #[test]
    fn test_create_with_explicit_values() {
        let request = create(&[
            ("application_name", "new-app"),
            ("image", IMAGE),
            ("timeout_seconds", "60"),
            ("port", "8080"),
            ("min_scale", "1"),
            ("max_scale", "3"),
            ("server", "other.example.com"),
            ("container_registry_username", "user"),
            ("container_registry_password", "pass"),
            ("components_name", "web"),
            ("max_cpu", "1"),
            ("max_memory", "2Gi"),
        ]);
        assert_eq!(
            (request.timeout_seconds, request.port, request.min_scale, request.max_scale),
            (60, 8080, 1, 3)
        );
        let component = &request.components[0];
        assert_eq!(component.name, "web");
        assert_eq!((component.max_cpu.as_str(), component.max_memory.as_str()), ("1", "2Gi"));
        let registry = &component.deploy_source.container_registry;
        assert_eq!(registry.server.as_deref(), Some("other.example.com"));
        assert_eq!(registry.username.as_deref(), Some("user"));
        assert_eq!(registry.password.as_deref(), Some("pass"));
    }

    #[test]
    fn test_server_defaults_to_image_host() {
        assert_eq!(registry_host("host/path/repo:tag"), "host");
        assert_eq!(registry_host("host"), "host");

        let request = create(&[("application_name", "a"), ("image", "nginx:latest")]);
        let registry = &request.components[0].deploy_source.container_registry;
        assert_eq!(registry.server.as_deref(), Some("nginx:latest"));
    }

    #[test]
    fn test_patch_leaves_unset_numbers_out() {
        let request = patch(&[
            ("application_name", "test-application"),
            ("image", IMAGE),
            ("port", "8080"),
        ]);
        assert_eq!(request.id, EXISTING_ID);
        assert_eq!(request.name.as_deref(), Some("test-application"));
        assert_eq!(request.port, Some(8080));
        assert_eq!(request.timeout_seconds, None);
        assert_eq!(request.min_scale, None);
        assert_eq!(request.max_scale, None);

        let component = &request.components.as_ref().unwrap()[0];
        assert_eq!(component.env, Some(vec![]));
        assert_eq!(component.probe, None);
    }

    #[test]
    fn test_env_is_parsed_in_order() {
        let request = create(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("env", "production: \"aaaa\"\nLOG_LEVEL: \"info\"\nMULTI: |\n  line one\n  line two\n"),
        ]);
        assert_eq!(
            request.components[0].env,
            Some(vec![
                EnvVar::new("production", "aaaa"),
                EnvVar::new("LOG_LEVEL", "info"),
                EnvVar::new("MULTI", "line one\nline two\n"),
            ])
        );
    }

    #[test]
    fn test_non_mapping_env_is_empty() {
        let items = [("image", IMAGE), ("env", "- a\n- b")];
        let mut create_items = items.to_vec();
        create_items.push(("application_name", "a"));
        assert_eq!(create(&create_items).components[0].env, None);

        let mut patch_items = items.to_vec();
        patch_items.push(("application_name", "test-application"));
        let request = patch(&patch_items);
        assert_eq!(request.components.unwrap()[0].env, Some(vec![]));
    }

    #[test]
    fn test_probe_needs_path_and_port() {
        let request = create(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("probe_path", "/healthz"),
        ]);
        assert_eq!(request.components[0].probe, None);

        let request = create(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("probe_path", "/healthz"),
            ("probe_port", "8080"),
        ]);
        let probe = request.components[0].probe.clone().unwrap();
        let http_get = probe.http_get.unwrap();
        assert_eq!(http_get.path, "/healthz");
        assert_eq!(http_get.port, 8080);
        assert_eq!(http_get.headers, None);
    }

    #[test]
    fn test_probe_headers_on_both_paths() {
        let headers = "X-Custom: \"abc\"";
        let request = create(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("probe_path", "/"),
            ("probe_port", "80"),
            ("probe_headers", headers),
        ]);
        let http_get = request.components[0].probe.clone().unwrap().http_get.unwrap();
        assert_eq!(http_get.headers, Some(vec![ProbeHeader::new("X-Custom", "abc")]));

        let request = patch(&[
            ("application_name", "test-application"),
            ("image", IMAGE),
            ("probe_path", "/"),
            ("probe_port", "80"),
        ]);
        let component = request.components.unwrap().remove(0);
        let http_get = component.probe.unwrap().http_get.unwrap();
        assert_eq!(http_get.headers, Some(vec![]));
    }

    #[test]
    fn test_required_inputs() {
        assert_eq!(error(&[("image", IMAGE)]), "application_name is required");
        assert_eq!(error(&[("application_name", "a")]), "image is required");
    }

    #[test]
    fn test_numbers_are_read_before_image() {
        assert_eq!(
            error(&[("application_name", "a"), ("timeout_seconds", "aa")]),
            "timeout_seconds is not a valid number: NaN"
        );
    }

    #[test]
    fn test_invalid_numbers_on_both_paths() {
        for field in ["timeout_seconds", "port", "min_scale", "max_scale", "probe_port"] {
            for name in ["new-app", "test-application"] {
                assert_eq!(
                    error(&[("application_name", name), ("image", IMAGE), (field, "abc")]),
                    format!("{field} is not a valid number: NaN")
                );
            }
        }
    }

    #[test]
    fn test_invalid_resources() {
        for (cpu, memory) in [("2", "256Mi"), ("0.1", "128Mi"), ("0.15", "3Gi")] {
            assert_eq!(
                error(&[
                    ("application_name", "a"),
                    ("image", IMAGE),
                    ("max_cpu", cpu),
                    ("max_memory", memory),
                ]),
                "Invalid maxCPU and maxMemory value"
            );
        }
    }

    #[test]
    fn test_structured_text_errors_propagate() {
        let err = error(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("env", "production: \"aaaa\"\n LOG_LEVEL: \"info\""),
        ]);
        assert!(err.starts_with("bad indentation of a mapping entry"), "{err}");

        let err = error(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("probe_path", "/"),
            ("probe_port", "80"),
            ("probe_headers", "production: \"aaaa\nLOG_LEVEL: \"info\""),
        ]);
        assert!(
            err.starts_with(
                "can not read a block mapping entry; a multiline key may not be an implicit key"
            ),
            "{err}"
        );
    }

    #[test]
    fn test_boolean_inputs() {
        let deployment = build(&[("application_name", "a"), ("image", IMAGE)]).unwrap();
        assert!(!deployment.inherit_env);
        assert!(!deployment.packet_filter.is_enabled);
        assert!(deployment.packet_filter.settings.is_empty());

        for key in ["inherit_env", "packet_filter_enabled"] {
            assert_eq!(
                error(&[("application_name", "test-application"), ("image", IMAGE), (key, "aaa")]),
                format!(
                    "Input does not meet YAML 1.2 \"Core Schema\" specification: {key}\n\
                     Support boolean input list: `true | True | TRUE | false | False | FALSE`"
                )
            );
        }

        let deployment = build(&[
            ("application_name", "test-application"),
            ("image", IMAGE),
            ("inherit_env", "True"),
        ])
        .unwrap();
        assert!(deployment.inherit_env);
    }

    #[test]
    fn test_inherit_env_is_not_read_on_create() {
        let deployment = build(&[
            ("application_name", "new-app"),
            ("image", IMAGE),
            ("inherit_env", "aaa"),
        ])
        .unwrap();
        assert!(matches!(deployment.request, ApplicationRequest::Create(_)));
        assert!(!deployment.inherit_env);

        let deployment = build(&[
            ("application_name", "new-app"),
            ("image", IMAGE),
            ("inherit_env", "true"),
        ])
        .unwrap();
        assert!(!deployment.inherit_env);
    }

    #[test]
    fn test_numbers_with_trailing_text() {
        let request = create(&[
            ("application_name", "new-app"),
            ("image", IMAGE),
            ("port", "8080abc"),
            ("max_scale", "1.5"),
        ]);
        assert_eq!(request.port, 8080);
        assert_eq!(request.max_scale, 1);
    }

    #[test]
    fn test_packet_filter() {
        let deployment = build(&[
            ("application_name", "a"),
            ("image", IMAGE),
            ("packet_filter_enabled", "true"),
            ("packet_filter_allowlist", "0.0.0.0/0\n1.1.1.1/32"),
        ])
        .unwrap();
        assert_eq!(
            deployment.packet_filter,
            PacketFilter {
                is_enabled: true,
                settings: vec![
                    PacketFilterSetting {
                        from_ip: "0.0.0.0".to_string(),
                        from_ip_prefix_length: 0,
                    },
                    PacketFilterSetting {
                        from_ip: "1.1.1.1".to_string(),
                        from_ip_prefix_length: 32,
                    },
                ],
            }
        );
    }

    #[test]
    fn test_allowlist_lines() {
        let settings = parse_allowlist(" 10.0.0.0/8 \n\n2001:db8::/32\n192.168.1.1").unwrap();
        let parsed: Vec<_> = settings
            .iter()
            .map(|s| (s.from_ip.as_str(), s.from_ip_prefix_length))
            .collect();
        assert_eq!(
            parsed,
            vec![("10.0.0.0", 8), ("2001:db8::", 32), ("192.168.1.1", 32)]
        );

        assert_eq!(
            parse_allowlist("10.0.0.0/8\nnot-an-ip/3").unwrap_err().to_string(),
            "packet_filter_allowlist entry is not a valid CIDR: not-an-ip/3"
        );
        assert!(parse_allowlist("10.0.0.0/33").is_err());
    }
}
