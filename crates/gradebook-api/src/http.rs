//! REST implementation of the persistence API.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::instrument;

use gradebook_core::model::{
    Allocation, Classroom, Enrollment, GradeFilter, GradeRecord, Student, UpsertGrade, Viewer,
};
use gradebook_core::policy::GradingPolicy;
use gradebook_core::traits::GradebookApi;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::wire::{Data, ErrorBody, Page, WireGradingConfig, WireViewer};

/// Client for the school's JSON API, authenticated with a token.
pub struct RestApi {
    base_url: String,
    token: String,
    page_size: u32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl RestApi {
    pub fn new(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            page_size: config.page_size,
            timeout_secs: config.timeout_secs,
            client,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("accept", "application/json");
        if !self.token.is_empty() {
            req = req.header("Authorization", format!("Token {}", self.token));
        }
        req
    }

    /// Send a request and map transport failures and error statuses.
    async fn send(&self, req: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        Err(match status {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(path.to_string()),
            404 => ApiError::NotFound(path.to_string()),
            _ => ApiError::Status { status, message },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let req = self.request(Method::GET, path).query(query);
        let response = self.send(req, path).await?;
        Self::decode(response).await
    }

    /// Fetch every page of a paginated list.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page_number = 1u32;
        loop {
            let mut params = query.to_vec();
            params.push(("page", page_number.to_string()));
            params.push(("page_size", self.page_size.to_string()));

            let page: Page<T> = self.get_json(path, &params).await?;
            let fetched = page.data.len();
            let has_next = page.has_next();
            items.extend(page.data);
            tracing::debug!(path, page = page_number, fetched, "fetched page");

            if !has_next || fetched == 0 {
                break;
            }
            page_number += 1;
        }
        Ok(items)
    }
}

#[async_trait]
impl GradebookApi for RestApi {
    #[instrument(skip(self))]
    async fn current_viewer(&self) -> anyhow::Result<Viewer> {
        let wire: WireViewer = self.get_json("/me", &[]).await?;
        Ok(Viewer::try_from(wire)?)
    }

    #[instrument(skip(self))]
    async fn classrooms(&self) -> anyhow::Result<Vec<Classroom>> {
        Ok(self.get_all("/classrooms", &[]).await?)
    }

    /// The classroom endpoint lists enrolled student ids only; names come
    /// from the school's student directory. Enrollment order is kept. An id
    /// missing from the directory keeps its row with an empty name.
    #[instrument(skip(self))]
    async fn classroom_students(&self, classroom_id: i64) -> anyhow::Result<Vec<Student>> {
        let path = format!("/classrooms/{classroom_id}/students");
        let (ids, directory) = futures::try_join!(
            self.get_json::<Data<Vec<i64>>>(&path, &[]),
            self.get_all::<Student>("/students", &[]),
        )?;

        let mut by_id: HashMap<i64, Student> = directory.into_iter().map(|s| (s.id, s)).collect();
        let students = ids
            .data
            .into_iter()
            .map(|id| {
                by_id.remove(&id).unwrap_or_else(|| {
                    tracing::warn!(
                        classroom_id,
                        student_id = id,
                        "enrolled student not in directory"
                    );
                    Student {
                        id,
                        first_name: String::new(),
                        last_name: String::new(),
                    }
                })
            })
            .collect();
        Ok(students)
    }

    #[instrument(skip(self))]
    async fn classroom_allocations(&self, classroom_id: i64) -> anyhow::Result<Vec<Allocation>> {
        let path = format!("/classrooms/{classroom_id}/allocations");
        let body: Data<Vec<Allocation>> = self.get_json(&path, &[]).await?;
        Ok(body.data)
    }

    #[instrument(skip(self))]
    async fn student_enrollments(&self, student_id: i64) -> anyhow::Result<Vec<Enrollment>> {
        let query = [
            ("student_id", student_id.to_string()),
            ("status", "active".to_string()),
        ];
        Ok(self.get_all("/enrollments", &query).await?)
    }

    #[instrument(skip(self))]
    async fn grading_policy(&self) -> anyhow::Result<Option<GradingPolicy>> {
        match self
            .get_json::<Data<WireGradingConfig>>("/grading-config", &[])
            .await
        {
            Ok(body) => Ok(Some(GradingPolicy::try_from(body.data)?)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn grades(&self, filter: &GradeFilter) -> anyhow::Result<Vec<GradeRecord>> {
        let mut query = Vec::new();
        if let Some(id) = filter.classroom_id {
            query.push(("classroom_id", id.to_string()));
        }
        if let Some(subject) = &filter.subject {
            query.push(("subject", subject.clone()));
        }
        if let Some(term) = filter.term {
            query.push(("term", term.to_string()));
        }
        if let Some(id) = filter.student_id {
            query.push(("student_id", id.to_string()));
        }
        Ok(self.get_all("/grades", &query).await?)
    }

    #[instrument(skip(self, grade), fields(student_id = grade.student_id))]
    async fn upsert_grade(&self, grade: &UpsertGrade) -> anyhow::Result<GradeRecord> {
        let req = self.request(Method::POST, "/grades").json(grade);
        let response = self.send(req, "/grades").await?;
        let body: Data<GradeRecord> = Self::decode(response).await?;
        Ok(body.data)
    }
}
