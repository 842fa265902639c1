use anyhow::Result;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tracing::info;

pub fn novel_payload(title: &str) -> Value {
    json!({
        "title": title,
        "description": "A story told in chapters",
        "status": "inProgress",
        "year": "2024",
        "author": "Jane Writer",
        "genres": ["fantasy"],
    })
}

pub async fn create_novel(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
) -> Result<(StatusCode, Value)> {
    let response = client
        .post(base_url.join("api/novel/create")?)
        .json(&novel_payload(title))
        .send()
        .await?;
    info!("Create novel response: {:#?}", response);
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}

pub async fn get_novel(client: &reqwest::Client, base_url: &Url, id: i64) -> Result<Value> {
    let response = client
        .get(base_url.join(&format!("api/novel/get/{id}"))?)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

pub async fn post_json(
    client: &reqwest::Client,
    base_url: &Url,
    path: &str,
    payload: Value,
) -> Result<(StatusCode, Value)> {
    let response = client.post(base_url.join(path)?).json(&payload).send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    Ok((status, body))
}
