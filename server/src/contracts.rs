//! Contracts and admin-managed contract templates
//!
//! A template body contains `{{name}}` placeholders for each declared
//! variable. Creating a contract from a template requires a value for every
//! declared variable.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Contract, ContractStatus, ContractTemplate};

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Contract not found")]
    NotFound,
    #[error("Template not found")]
    TemplateNotFound,
    #[error("Signer not found")]
    SignerNotFound,
    #[error("Missing template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
    #[error("Contract content or template_id is required")]
    NoContent,
    #[error("Only the designated signer can sign this contract")]
    NotSigner,
    #[error("Contract is not pending")]
    NotPending,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub body: String,
    /// Declared variables; inferred from the body when omitted
    pub variables: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct CreateContractRequest {
    pub signer_id: Uuid,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContractStatusRequest {
    pub status: ContractStatus,
}

#[derive(Debug, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
}

/// Placeholder names appearing in `body`, in order of first appearance
pub fn placeholders(body: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let name = after[..end].trim();
        if !name.is_empty() && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
        rest = &after[end + 2..];
    }
    names
}

/// Substitute `{{name}}` placeholders. Every declared variable must have a value.
pub fn render_template(
    body: &str,
    variables: &[String],
    values: &HashMap<String, String>,
) -> Result<String, ContractError> {
    let missing: Vec<String> = variables
        .iter()
        .filter(|name| !values.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ContractError::MissingVariables(missing));
    }

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        out.push_str(&rest[..start]);
        let name = after[..end].trim();
        match values.get(name) {
            Some(value) => out.push_str(value),
            // undeclared placeholders are left as written
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

pub struct ContractService {
    pool: PgPool,
}

impl ContractService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_templates(&self) -> Result<Vec<ContractTemplate>, ContractError> {
        let templates =
            sqlx::query_as::<_, ContractTemplate>("SELECT * FROM contract_templates ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(templates)
    }

    pub async fn create_template(&self, req: &CreateTemplateRequest) -> Result<ContractTemplate, ContractError> {
        let variables = req
            .variables
            .clone()
            .unwrap_or_else(|| placeholders(&req.body));

        let template = sqlx::query_as::<_, ContractTemplate>(
            r#"
            INSERT INTO contract_templates (name, body, variables)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.body)
        .bind(Json(variables))
        .fetch_one(&self.pool)
        .await?;
        Ok(template)
    }

    pub async fn create(&self, creator_id: Uuid, req: &CreateContractRequest) -> Result<Contract, ContractError> {
        let signer_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)")
                .bind(req.signer_id)
                .fetch_one(&self.pool)
                .await?;
        if !signer_exists {
            return Err(ContractError::SignerNotFound);
        }

        let (title, content) = match req.template_id {
            Some(template_id) => {
                let template = sqlx::query_as::<_, ContractTemplate>(
                    "SELECT * FROM contract_templates WHERE id = $1",
                )
                .bind(template_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(ContractError::TemplateNotFound)?;

                let content = render_template(&template.body, &template.variables.0, &req.values)?;
                (req.title.clone().unwrap_or(template.name), content)
            }
            None => {
                let content = req
                    .content
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(ContractError::NoContent)?;
                (req.title.clone().unwrap_or_else(|| "Contract".to_string()), content)
            }
        };

        let contract = sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts (creator_id, signer_id, template_id, title, content, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(creator_id)
        .bind(req.signer_id)
        .bind(req.template_id)
        .bind(title)
        .bind(content)
        .bind(ContractStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(contract_id = %contract.id, %creator_id, signer_id = %contract.signer_id, "contract created");
        Ok(contract)
    }

    /// Contracts the user created or must sign
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Contract>, ContractError> {
        let contracts = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE creator_id = $1 OR signer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    pub async fn sign(&self, id: Uuid, user_id: Uuid) -> Result<Contract, ContractError> {
        let contract = self.get(id).await?;
        if contract.signer_id != user_id {
            return Err(ContractError::NotSigner);
        }

        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET status = 'signed', signed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ContractError::NotPending)
    }

    pub async fn list(
        &self,
        status: Option<ContractStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Contract>, ContractError> {
        let contracts = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE ($1::contract_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(contracts)
    }

    pub async fn get(&self, id: Uuid) -> Result<Contract, ContractError> {
        sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ContractError::NotFound)
    }

    pub async fn set_status(&self, id: Uuid, status: ContractStatus) -> Result<Contract, ContractError> {
        sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts
            SET status = $2,
                signed_at = CASE WHEN $2 = 'signed'::contract_status
                                 THEN COALESCE(signed_at, NOW()) ELSE signed_at END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ContractError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_all_placeholders() {
        let body = "This agreement between {{ parent }} and {{surrogate}} ({{parent}}).";
        let vars = vec!["parent".to_string(), "surrogate".to_string()];
        let out = render_template(body, &vars, &values(&[("parent", "Ada"), ("surrogate", "Ngozi")])).unwrap();
        assert_eq!(out, "This agreement between Ada and Ngozi (Ada).");
    }

    #[test]
    fn reports_every_missing_variable() {
        let vars = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = render_template("{{a}} {{b}} {{c}}", &vars, &values(&[("b", "x")])).unwrap_err();
        match err {
            ContractError::MissingVariables(missing) => assert_eq!(missing, vec!["a", "c"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn undeclared_placeholders_survive() {
        let out = render_template("Hi {{name}}, {{unknown}}", &["name".into()], &values(&[("name", "Tobi")]))
            .unwrap();
        assert_eq!(out, "Hi Tobi, {{unknown}}");
    }

    #[test]
    fn unterminated_braces_are_literal() {
        let out = render_template("Total {{amount", &[], &HashMap::new()).unwrap();
        assert_eq!(out, "Total {{amount");
    }

    #[test]
    fn placeholders_are_deduplicated() {
        assert_eq!(placeholders("{{x}} {{ y }} {{x}} {{}}"), vec!["x", "y"]);
    }

    #[test]
    fn missing_variables_message_lists_names() {
        let err = ContractError::MissingVariables(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Missing template variables: a, b");
    }
}
