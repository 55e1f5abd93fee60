use std::sync::Arc;

use domain::{DomainError, RepositoryError, User, UserId, Username};

use crate::{
    clock::Clock, error::ApplicationError, password::PasswordHasher, repository::UserRepository,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub username: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;

        if self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let user = User::register(
            UserId::generate(),
            username,
            password_hash,
            request.profile_picture.unwrap_or_default(),
            self.deps.clock.now(),
        );

        // 并发注册同名用户时由唯一约束兜底
        match self.deps.user_repository.create(user).await {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Conflict) => Err(DomainError::UserAlreadyExists.into()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let username =
            Username::parse(request.username).map_err(|_| ApplicationError::InvalidCredentials)?;
        let user = self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .ok_or(ApplicationError::InvalidCredentials)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    /// 除调用者以外的所有用户
    pub async fn list_others(&self, caller: UserId) -> Result<Vec<User>, ApplicationError> {
        let users = self.deps.user_repository.list_all().await?;
        Ok(users.into_iter().filter(|user| user.id != caller).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory::InMemoryUserRepository;
    use crate::password::{MockPasswordHasher, PasswordHasherError};
    use crate::repository::MockUserRepository;
    use domain::PasswordHash;

    fn fake_hasher() -> MockPasswordHasher {
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .returning(|plain| Ok(PasswordHash::new(format!("hashed:{plain}")).unwrap()));
        hasher
            .expect_verify()
            .returning(|plain, hashed| Ok(hashed.as_str() == format!("hashed:{plain}")));
        hasher
    }

    fn service_with(repository: Arc<dyn UserRepository>) -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: repository,
            password_hasher: Arc::new(fake_hasher()),
            clock: Arc::new(SystemClock),
        })
    }

    fn register_request(username: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            username: username.into(),
            password: "secret-password".into(),
            profile_picture: None,
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let service = service_with(Arc::new(InMemoryUserRepository::new()));

        let user = service.register(register_request("alice")).await.unwrap();
        assert_eq!(user.username.as_str(), "alice");
        assert_eq!(user.password.as_str(), "hashed:secret-password");

        let authenticated = service
            .authenticate(AuthenticateUserRequest {
                username: "alice".into(),
                password: "secret-password".into(),
            })
            .await
            .unwrap();
        assert_eq!(authenticated.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let service = service_with(Arc::new(InMemoryUserRepository::new()));
        service.register(register_request("alice")).await.unwrap();

        let err = service.register(register_request("alice")).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn storage_conflict_maps_to_user_exists() {
        let mut repository = MockUserRepository::new();
        repository.expect_find_by_username().returning(|_| Ok(None));
        repository
            .expect_create()
            .returning(|_| Err(RepositoryError::Conflict));
        let service = service_with(Arc::new(repository));

        let err = service.register(register_request("bob")).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let service = service_with(Arc::new(InMemoryUserRepository::new()));
        service.register(register_request("alice")).await.unwrap();

        let wrong_password = service
            .authenticate(AuthenticateUserRequest {
                username: "alice".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        let unknown_user = service
            .authenticate(AuthenticateUserRequest {
                username: "mallory".into(),
                password: "secret-password".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ApplicationError::InvalidCredentials));
        assert!(matches!(unknown_user, ApplicationError::InvalidCredentials));
    }

    #[tokio::test]
    async fn hasher_failure_propagates() {
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .returning(|_| Err(PasswordHasherError::Hash("boom".into())));
        let service = UserService::new(UserServiceDependencies {
            user_repository: Arc::new(InMemoryUserRepository::new()),
            password_hasher: Arc::new(hasher),
            clock: Arc::new(SystemClock),
        });

        let err = service.register(register_request("alice")).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Password(_)));
    }

    #[tokio::test]
    async fn list_others_excludes_caller() {
        let service = service_with(Arc::new(InMemoryUserRepository::new()));
        let alice = service.register(register_request("alice")).await.unwrap();
        let bob = service.register(register_request("bob")).await.unwrap();

        let others = service.list_others(alice.id).await.unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, bob.id);

        let err = service.get_user(UserId::generate()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Domain(DomainError::UserNotFound)));
    }
}
