// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embedded templates for files the adapters write next to the generated sources.

use minijinja::Environment;

pub const DOCKERFILE: &str = include_str!("../templates/Dockerfile.j2");
pub const WORKLOAD_MANIFEST: &str = include_str!("../templates/workload.yaml.j2");
/// Static; keeps build output and VCS metadata out of the image build context.
pub const DOCKERIGNORE: &str = include_str!("../templates/dockerignore");

/// Render one template. `name` must not end in `.html`/`.xml`, which would enable
/// HTML escaping.
pub fn render(name: &str, source: &str, ctx: minijinja::Value) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template(name, source)?;
    env.get_template(name)?.render(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_dockerfile_renders_package_and_port() {
        let rendered = render(
            "Dockerfile",
            DOCKERFILE,
            context! {
                package_name => "tradeclearancev2",
                builder_image => "rust:1-slim",
                runtime_image => "debian:bookworm-slim",
                port => 8080,
            },
        )
        .unwrap();

        assert!(rendered.contains("FROM rust:1-slim AS build"));
        assert!(rendered.contains("/src/target/release/tradeclearancev2 /app/tradeclearancev2"));
        assert!(rendered.contains("EXPOSE 8080"));
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn test_manifest_is_not_html_escaped() {
        let rendered = render(
            "workload.yaml",
            WORKLOAD_MANIFEST,
            context! {
                name => "review-dev",
                namespace => "flowship-dev",
                process_id => "document-review",
                replicas => 1,
                image => "registry.local/flowship/document-review-dev:3",
                port => 8080,
                engine_url => "http://zeebe:8080/?a=1&b=2",
            },
        )
        .unwrap();

        assert!(rendered.contains("kind: Deployment"));
        assert!(rendered.contains("kind: Service"));
        assert!(rendered.contains("image: \"registry.local/flowship/document-review-dev:3\""));
        assert!(rendered.contains("?a=1&b=2"));
    }
}
