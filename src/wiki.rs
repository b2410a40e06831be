use serde::Deserialize;

/// Wikipedia page lookup. Never fails: any problem yields the fallback URL.
pub struct WikiClient {
    client: reqwest::Client,
    api_url: String,
    fallback_url: String,
}

impl WikiClient {
    pub fn new(client: reqwest::Client, api_url: String, fallback_url: String) -> Self {
        Self { client, api_url, fallback_url }
    }

    pub async fn fetch_link(&self, title: &str) -> String {
        match self.lookup(title).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::debug!(title, "no wikipedia page found");
                self.fallback_url.clone()
            },
            Err(err) => {
                tracing::warn!(title, error = %err, "wikipedia lookup failed");
                self.fallback_url.clone()
            },
        }
    }

    async fn lookup(&self, title: &str) -> reqwest::Result<Option<String>> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("titles", title),
                ("prop", "info"),
                ("inprop", "url"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: QueryResponse = resp.json().await?;
        Ok(body.first_page_url())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    query: Query,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Query {
    pages: Vec<Page>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Page {
    fullurl: Option<String>,
}

impl QueryResponse {
    fn first_page_url(self) -> Option<String> {
        self.query.pages.into_iter().next()?.fullurl.filter(|u| !u.trim().is_empty())
    }
}
