//! Fetch command - resolve a URL through the registry

use super::open_storage;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{QuarryError, QuarryResult};
use crate::request::{Method, UreqTransport};
use crate::resource::{NetworkDescriptor, Registry, RequestDescriptor, ResolutionSpec};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> QuarryResult<()> {
    let transport = Arc::new(UreqTransport::from_config(&config.http));
    let registry = Registry::with_transport(transport, open_storage(config)?);

    let lifespan = match (args.no_cache, args.ttl) {
        (true, _) => 0,
        (false, Some(ttl)) => ttl,
        (false, None) => i64::try_from(config.cache.default_lifespan_secs).unwrap_or(i64::MAX),
    };
    let descriptor = descriptor(args.method.parse()?, args.text, lifespan, args.pointer);

    let ids = registry.register_network([("fetch", descriptor)]);
    let id = ids
        .first()
        .ok_or_else(|| QuarryError::Internal("registration returned no id".to_string()))?;

    let value = registry.fetch(id, &[Value::String(args.url.clone())]).await?;
    info!("Resolved {}", args.url);

    match value {
        Value::String(text) if args.text => println!("{}", text),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }

    Ok(())
}

/// Descriptor taking the URL as its only query argument
fn descriptor(
    method: Method,
    text: bool,
    lifespan: i64,
    pointer: Option<String>,
) -> NetworkDescriptor {
    NetworkDescriptor::factory(move |query| {
        let url = query
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| QuarryError::User("A URL is required".to_string()))?;

        let mut request = if text {
            RequestDescriptor::text(url)
        } else {
            RequestDescriptor::json(url)
        };
        request.config.method = method;

        let spec = ResolutionSpec::new(request).with_lifespan_secs(lifespan);

        Ok(match pointer.clone() {
            Some(pointer) => spec.with_transform(move |value| {
                value.pointer(&pointer).cloned().unwrap_or(Value::Null)
            }),
            None => spec,
        })
    })
}
