use crate::{api::ApiRequest, cli::actions::console::Console};
use anyhow::Result;
use reqwest::Method;
use serde_json::Value;

#[derive(Debug)]
pub struct Args {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl Args {
    #[must_use]
    pub fn into_request(self) -> ApiRequest {
        let mut request = ApiRequest::new(self.method, self.path);
        for (key, value) in self.query {
            request = request.with_query(key, value);
        }
        match self.body {
            Some(body) => request.with_json(body),
            None => request,
        }
    }
}

/// Send an authorized call and print the response body.
/// # Errors
/// Returns an error if the call fails, including when the session cannot be recovered.
pub async fn execute(console: &Console, args: Args) -> Result<()> {
    let request = args.into_request();
    let description = format!("{} {}", request.method(), request.path());

    let response = console.client.send(request).await.map_err(|err| {
        let hint = if err.is_auth_failure() {
            "; sign in again with `jank-console login`"
        } else {
            ""
        };
        anyhow::Error::new(err).context(format!("{description} failed{hint}"))
    })?;

    println!("{}", serde_json::to_string_pretty(&response.into_body())?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_request() {
        let request = Args {
            method: Method::DELETE,
            path: "/api/v1/post/delete".to_string(),
            body: Some(json!({ "id": 9 })),
            query: vec![("force".to_string(), "true".to_string())],
        }
        .into_request();

        assert_eq!(request.method(), &Method::DELETE);
        assert_eq!(request.path(), "/api/v1/post/delete");
        assert_eq!(request.body(), Some(&json!({ "id": 9 })));
        assert_eq!(request.query(), &[("force".to_string(), "true".to_string())]);
        assert!(!request.is_retried());
    }
}
