use anyhow::Result;
use chrono::Utc;
use mongodb::Database;

use crate::models::audit_log::{AuditEventType, AuditLog};

/// Parameters for audit event logging
#[derive(Debug)]
pub struct AuditEventParams {
    pub event_type: AuditEventType,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub success: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub error_message: Option<String>,
}

/// Service for audit logging. Callers ignore the result: a failed audit
/// write must never fail the originating request.
pub struct AuditService {
    mongo: Database,
}

impl AuditService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Log an audit event
    pub async fn log_event(&self, params: AuditEventParams) -> Result<()> {
        let audit_log = AuditLog {
            id: None,
            event_type: params.event_type,
            user_id: params.user_id,
            email: params.email,
            success: params.success,
            ip: params.ip,
            user_agent: params.user_agent,
            details: params.details,
            error_message: params.error_message,
            created_at: Utc::now(),
        };

        let collection = self.mongo.collection::<AuditLog>("audit_log");
        if let Err(e) = collection.insert_one(audit_log).await {
            tracing::warn!("Failed to write audit log entry: {}", e);
        }

        Ok(())
    }

    /// Log a successful login
    pub async fn log_login_success(
        &self,
        user_id: &str,
        email: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::Login,
            user_id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            success: true,
            ip,
            user_agent,
            details: None,
            error_message: None,
        })
        .await
    }

    /// Log a failed login attempt
    pub async fn log_login_failed(
        &self,
        email: &str,
        ip: Option<String>,
        user_agent: Option<String>,
        error: &str,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::LoginFailed,
            user_id: None,
            email: Some(email.to_string()),
            success: false,
            ip,
            user_agent,
            details: None,
            error_message: Some(error.to_string()),
        })
        .await
    }

    /// Log a successful registration
    pub async fn log_register_success(
        &self,
        user_id: &str,
        email: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::Register,
            user_id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            success: true,
            ip,
            user_agent,
            details: None,
            error_message: None,
        })
        .await
    }

    /// Log a failed registration
    pub async fn log_register_failed(
        &self,
        email: &str,
        ip: Option<String>,
        user_agent: Option<String>,
        error: &str,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::RegisterFailed,
            user_id: None,
            email: Some(email.to_string()),
            success: false,
            ip,
            user_agent,
            details: None,
            error_message: Some(error.to_string()),
        })
        .await
    }

    /// Log a logout
    pub async fn log_logout(
        &self,
        user_id: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::Logout,
            user_id: Some(user_id.to_string()),
            email: None,
            success: true,
            ip,
            user_agent,
            details: None,
            error_message: None,
        })
        .await
    }

    /// Log a password change
    pub async fn log_password_change(
        &self,
        user_id: &str,
        success: bool,
        error_message: Option<String>,
    ) -> Result<()> {
        let event_type = if success {
            AuditEventType::ChangePassword
        } else {
            AuditEventType::ChangePasswordFailed
        };

        self.log_event(AuditEventParams {
            event_type,
            user_id: Some(user_id.to_string()),
            email: None,
            success,
            ip: None,
            user_agent: None,
            details: None,
            error_message,
        })
        .await
    }

    /// Log an admin role change
    pub async fn log_role_change(
        &self,
        admin_id: &str,
        target_user_id: &str,
        new_role: &str,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::RoleChange,
            user_id: Some(admin_id.to_string()),
            email: None,
            success: true,
            ip: None,
            user_agent: None,
            details: Some(format!("user {} -> role {}", target_user_id, new_role)),
            error_message: None,
        })
        .await
    }

    /// Log an admin user deletion
    pub async fn log_user_delete(
        &self,
        admin_id: &str,
        target_user_id: &str,
        target_email: &str,
    ) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::UserDelete,
            user_id: Some(admin_id.to_string()),
            email: Some(target_email.to_string()),
            success: true,
            ip: None,
            user_agent: None,
            details: Some(format!("deleted user {}", target_user_id)),
            error_message: None,
        })
        .await
    }

    /// Log a course creation
    pub async fn log_course_create(&self, instructor_id: &str, course_id: &str) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::CourseCreate,
            user_id: Some(instructor_id.to_string()),
            email: None,
            success: true,
            ip: None,
            user_agent: None,
            details: Some(format!("created course {}", course_id)),
            error_message: None,
        })
        .await
    }

    /// Log a course deletion
    pub async fn log_course_delete(&self, user_id: &str, course_id: &str) -> Result<()> {
        self.log_event(AuditEventParams {
            event_type: AuditEventType::CourseDelete,
            user_id: Some(user_id.to_string()),
            email: None,
            success: true,
            ip: None,
            user_agent: None,
            details: Some(format!("deleted course {}", course_id)),
            error_message: None,
        })
        .await
    }
}
