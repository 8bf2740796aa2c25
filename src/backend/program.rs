// ABOUTME: Renders the engine's desired-state description for one site.
// ABOUTME: A YAML-runtime project: website bucket, index object, public-read policy.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use super::BackendError;

/// Object key and index document of the served page.
pub const INDEX_KEY: &str = "index.html";
/// Content type of the served page.
pub const CONTENT_TYPE: &str = "text/html; charset=utf-8";
/// Stack output carrying the resolved website endpoint.
pub const URL_OUTPUT: &str = "website_url";
/// Stack configuration key carrying the page content.
pub const CONTENT_CONFIG_KEY: &str = "content";

/// The provisioning program shared by every site stack.
///
/// The program itself is identical for all sites; the page content is fed in
/// per stack through the `content` configuration value (base64, so the
/// payload stays opaque bytes end to end). Each stack therefore converges to
/// one website bucket, one index object, and one bucket policy granting
/// public read on all objects.
#[derive(Debug, Clone)]
pub struct SiteProgram {
    project: String,
}

impl SiteProgram {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Render the project file submitted to the engine.
    pub fn render(&self) -> Result<String, BackendError> {
        let project = json!({
            "name": self.project,
            "runtime": "yaml",
            "description": "Static website stacks managed by kiosk",
            "configuration": {
                (CONTENT_CONFIG_KEY): { "type": "string" },
            },
            "resources": {
                "site-bucket": {
                    "type": "aws:s3:Bucket",
                    "properties": {
                        "website": { "indexDocument": INDEX_KEY },
                    },
                },
                "index": {
                    "type": "aws:s3:BucketObject",
                    "properties": {
                        "bucket": "${site-bucket.id}",
                        "contentBase64": format!("${{{CONTENT_CONFIG_KEY}}}"),
                        "key": INDEX_KEY,
                        "contentType": CONTENT_TYPE,
                    },
                },
                "bucket-policy": {
                    "type": "aws:s3:BucketPolicy",
                    "properties": {
                        "bucket": "${site-bucket.id}",
                        "policy": {
                            "fn::toJSON": {
                                "Version": "2012-10-17",
                                "Statement": {
                                    "Effect": "Allow",
                                    "Principal": "*",
                                    "Action": ["s3:GetObject"],
                                    // Policy refers to the bucket explicitly
                                    "Resource": [{
                                        "fn::join": ["", [
                                            "arn:aws:s3:::",
                                            "${site-bucket.id}",
                                            "/*",
                                        ]],
                                    }],
                                },
                            },
                        },
                    },
                },
            },
            "outputs": {
                (URL_OUTPUT): "${site-bucket.websiteEndpoint}",
            },
        });

        serde_yaml::to_string(&project)
            .map_err(|e| BackendError::engine(format!("failed to render program: {e}")))
    }

    /// Encode page content for the stack configuration value.
    pub fn encode_content(content: &[u8]) -> String {
        STANDARD.encode(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_declares_all_site_resources() {
        let yaml = SiteProgram::new("kiosk").render().unwrap();
        assert!(yaml.contains("name: kiosk"));
        assert!(yaml.contains("runtime: yaml"));
        assert!(yaml.contains("aws:s3:Bucket"));
        assert!(yaml.contains("aws:s3:BucketObject"));
        assert!(yaml.contains("aws:s3:BucketPolicy"));
        assert!(yaml.contains("indexDocument: index.html"));
        assert!(yaml.contains("website_url"));
    }

    #[test]
    fn render_wires_content_through_config() {
        let yaml = SiteProgram::new("kiosk").render().unwrap();
        assert!(yaml.contains("contentBase64"));
        assert!(yaml.contains("${content}"));
        assert!(yaml.contains("text/html; charset=utf-8"));
    }

    #[test]
    fn policy_targets_all_bucket_objects() {
        let yaml = SiteProgram::new("kiosk").render().unwrap();
        assert!(yaml.contains("arn:aws:s3:::"));
        assert!(yaml.contains("2012-10-17"));
        assert!(yaml.contains("s3:GetObject"));
    }

    #[test]
    fn content_encoding_is_base64() {
        let encoded = SiteProgram::encode_content(b"<h1>hi</h1>");
        assert_eq!(encoded, "PGgxPmhpPC9oMT4=");
    }
}
