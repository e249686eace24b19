use std::collections::HashMap;

use anyhow::Result;
use futures::future::join_all;

use crate::{
    config::Config,
    error::WpError,
    wordpress::{PostQuery, WpClient},
};

/// Check the WordPress endpoints the site depends on.
/// Return true if every endpoint responds as expected.
pub async fn check_wordpress(config: &Config) -> Result<bool> {
    let client = WpClient::new(&config.wordpress);
    println!("Checking WordPress API at {}", client.api_url());

    let mut probes = vec![
        probe(&client, Probe::Posts),
        probe(&client, Probe::Categories),
        probe(&client, Probe::Contributors),
        probe(&client, Probe::PostType(config.magazine.post_type.clone())),
    ];
    probes.extend(config.sections.iter().filter_map(|section| {
        section.category.as_ref().map(|slug| {
            probe(
                &client,
                Probe::Category {
                    section: section.slug.clone(),
                    slug: slug.clone(),
                },
            )
        })
    }));

    let conditions = join_all(probes).await.into_iter().fold(
        HashMap::new(),
        |mut acc, (probe, condition)| match condition {
            Condition::Normal => acc,
            _ => {
                let vec: &mut Vec<_> = acc.entry(condition).or_default();
                vec.push(probe);
                acc
            }
        },
    );

    let check_condition = |condition, statement: &str| {
        if let Some(probes) = conditions.get(&condition) {
            println!("\nThe following {statement}:");
            probes.iter().for_each(|probe| println!("- {probe}"));
        }
    };
    check_condition(Condition::Missing, "are missing");
    check_condition(Condition::Unreachable, "are unreachable");
    check_condition(Condition::Malformed, "have an unexpected response");

    if conditions.is_empty() {
        println!("Everything looks good.");
    }
    Ok(conditions.is_empty())
}

async fn probe(client: &WpClient, probe: Probe) -> (Probe, Condition) {
    let result = match &probe {
        Probe::Posts => client
            .posts(&PostQuery::new().per_page(1))
            .await
            .map(|_| true),
        Probe::Categories => client.categories().await.map(|_| true),
        Probe::Contributors => client.contributors().await.map(|_| true),
        Probe::PostType(post_type) => client
            .post_type(post_type, &PostQuery::new().per_page(1))
            .await
            .map(|_| true),
        Probe::Category { slug, .. } => client
            .category_by_slug(slug)
            .await
            .map(|category| category.is_some()),
    };
    let condition = match result {
        Ok(true) => Condition::Normal,
        Ok(false) => Condition::Missing,
        Err(err) if err.is_not_found() => Condition::Missing,
        Err(WpError::Json { .. }) => Condition::Malformed,
        Err(_) => Condition::Unreachable,
    };
    (probe, condition)
}

#[derive(Debug)]
enum Probe {
    Posts,
    Categories,
    Contributors,
    PostType(String),
    Category { section: String, slug: String },
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Probe::Posts => write!(f, "posts (/wp/v2/posts)"),
            Probe::Categories => write!(f, "categories (/wp/v2/categories)"),
            Probe::Contributors => write!(f, "contributors"),
            Probe::PostType(post_type) => write!(f, "post type `{post_type}` (/wp/v2/{post_type})"),
            Probe::Category { section, slug } => {
                write!(f, "category `{slug}` of section `{section}`")
            }
        }
    }
}

#[derive(Debug, Hash, PartialEq, Eq)]
enum Condition {
    Normal,
    Missing,
    Unreachable,
    Malformed,
}
