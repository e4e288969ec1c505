use civic_api::{CommentId, Error as ApiError, IssueId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn email_already_used(email: String) -> Error {
        Error::Api(ApiError::EmailAlreadyUsed(email))
    }

    pub fn unknown_issue(issue: IssueId) -> Error {
        Error::Api(ApiError::UnknownIssue(issue))
    }

    pub fn unknown_user(user: UserId) -> Error {
        Error::Api(ApiError::UnknownUser(user))
    }

    pub fn unknown_parent(parent: CommentId) -> Error {
        Error::Api(ApiError::UnknownParent(parent))
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let err = match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) if err.is_validation() => {
                tracing::debug!("rejecting invalid request: {err}");
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        };
        (
            err.status_code(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            err.contents(),
        )
            .into_response()
    }
}
