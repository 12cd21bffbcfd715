//! Asset and mediafile operations.
//!
//! Each call builds the REST path and form body, then returns the one field
//! the caller needs from the first response item.

use crate::client::MediaMosaClient;
use crate::error::Result;
use tracing::debug;
use url::form_urlencoded;

fn form(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

impl MediaMosaClient {
    /// Create an empty asset owned by the client user; returns its `asset_id`.
    pub async fn create_asset(&self) -> Result<String> {
        let body = form(&[("user_id", self.user())]);
        let result = self.post("/asset/create", &body).await?;

        let asset_id = result.first_field("asset_id")?.to_string();
        debug!(asset_id = %asset_id, "Created asset");
        Ok(asset_id)
    }

    /// Create a mediafile inside an asset; returns its `mediafile_id`.
    pub async fn create_mediafile(&self, asset_id: &str) -> Result<String> {
        let body = form(&[("user_id", self.user()), ("asset_id", asset_id)]);
        let result = self.post("/mediafile/create", &body).await?;

        let mediafile_id = result.first_field("mediafile_id")?.to_string();
        debug!(asset_id = %asset_id, mediafile_id = %mediafile_id, "Created mediafile");
        Ok(mediafile_id)
    }

    /// Request an upload ticket for a mediafile; returns the upload `action` URL.
    pub async fn create_upload_ticket(&self, mediafile_id: &str) -> Result<String> {
        let path = format!("/mediafile/{}/uploadticket/create", mediafile_id);
        let body = form(&[("user_id", self.user()), ("mediafile_id", mediafile_id)]);
        let result = self.post(&path, &body).await?;

        Ok(result.first_field("action")?.to_string())
    }

    /// Play URL of an asset.
    ///
    /// `query` is appended verbatim and should start with `?`, e.g.
    /// `?user_id=app&mediafile_id=xyz&response=plain`.
    pub async fn asset_play_url(&self, asset_id: &str, query: &str) -> Result<String> {
        let path = format!("/asset/{}/play{}", asset_id, query);
        let result = self.get(&path).await?;

        let url = result.first_field("output")?.to_string();
        debug!(asset_id = %asset_id, url = %url, "Play URL");
        Ok(url)
    }

    /// Transcode profile of the first mediafile of an asset.
    pub async fn asset_first_profile_id(&self, asset_id: &str, acl_domain: &str) -> Result<String> {
        let query = form(&[
            ("show_stills", "TRUE"),
            ("show_collections", "FALSE"),
            ("acl_realm", ""),
            ("acl_domain", acl_domain),
            ("acl_user_id", ""),
            ("is_app_admin", "FALSE"),
        ]);
        let path = format!("/asset/{}?{}", asset_id, query);
        let result = self.get(&path).await?;

        Ok(result
            .first_path(&["mediafiles", "mediafile", "transcode_profile_id"])?
            .to_string())
    }
}
