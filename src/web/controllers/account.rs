//! Login, registration, logout and profiles.

use axum::http::StatusCode;
use serde::Serialize;

use crate::db::{NewUser, User};
use crate::session::{FLASH_ERRORS, FLASH_SUCCESS};
use crate::web::container::Container;
use crate::web::error::{Failure, Fatal, Outcome};
use crate::web::forms::{LoginForm, RegistrationForm, CSRF_ERROR, LOGOUT_ACTION};
use crate::ForumError;

use super::query_id;

const INVALID_CREDENTIALS: &str = "Invalid Credentials";

#[derive(Serialize)]
struct LoginView {
    title: &'static str,
    login_form: LoginForm,
    login_error: Option<&'static str>,
    registration_form: RegistrationForm,
}

fn render_login(
    c: &mut Container,
    mut login_form: LoginForm,
    login_error: Option<&'static str>,
    mut registration_form: RegistrationForm,
) -> Outcome {
    login_form.csrf = c.csrf_token(LoginForm::ACTION)?;
    registration_form.csrf = c.csrf_token(RegistrationForm::ACTION)?;
    let view = LoginView {
        title: "Login",
        login_form,
        login_error,
        registration_form,
    };
    c.render("login", &view)
}

/// `GET /login`, `GET /register`
pub async fn login_page(c: &mut Container) -> Outcome {
    render_login(c, LoginForm::default(), None, RegistrationForm::default())
}

/// `POST /login`
pub async fn login(c: &mut Container) -> Outcome {
    let form = LoginForm::decode(&c.form());

    if form.is_valid() && c.csrf_valid(&form.csrf, LoginForm::ACTION)? {
        if let Some(user) = authenticate(c, &form).await? {
            tracing::info!(user_id = user.id, "User logged in");
            c.sign_in(user)?;
            return c.redirect("/", StatusCode::FOUND);
        }
    }

    tracing::info!(username = %form.username, "Login failed");
    c.set_status(StatusCode::BAD_REQUEST);
    let form = LoginForm {
        username: form.username,
        ..LoginForm::default()
    };
    render_login(c, form, Some(INVALID_CREDENTIALS), RegistrationForm::default())
}

async fn authenticate(c: &Container, form: &LoginForm) -> Result<Option<User>, Failure> {
    let user = c.users().get_by_username(&form.username).await?;
    Ok(user.filter(|user| user.authenticate(&form.password)))
}

/// `POST /register`
pub async fn register(c: &mut Container) -> Outcome {
    let mut form = RegistrationForm::decode(&c.form());

    if !c.csrf_valid(&form.csrf, RegistrationForm::ACTION)? {
        form.errors.add("csrf", CSRF_ERROR);
    }
    if !form.errors.has("username")
        && c.users().get_by_username(&form.username).await?.is_some()
    {
        form.errors.add("username", "username is already taken");
    }
    if !form.errors.has("email") && c.users().get_by_email(&form.email).await?.is_some() {
        form.errors.add("email", "email is already registered");
    }

    if form.is_valid() {
        let new_user = NewUser::with_plain_password(
            form.username.clone(),
            form.email.clone(),
            &form.password,
        )
        .map_err(|e| Fatal::new(format!("cannot hash password: {e}")))?;

        match c.users().create(&new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, username = %user.username, "User registered");
                c.session()?
                    .add_flash("Registration Successful, please login", FLASH_SUCCESS);
                return c.redirect("/login", StatusCode::FOUND);
            }
            // Lost a race against a concurrent registration.
            Err(ForumError::Validation(message)) => form.errors.add("username", message),
            Err(e) => return Err(e.into()),
        }
    }

    c.session()?
        .add_flash("Registration Form has errors", FLASH_ERRORS);
    c.set_status(StatusCode::BAD_REQUEST);
    let form = RegistrationForm {
        username: form.username,
        email: form.email,
        errors: form.errors,
        ..RegistrationForm::default()
    };
    render_login(c, LoginForm::default(), None, form)
}

/// `POST /logout`
pub async fn logout(c: &mut Container) -> Outcome {
    let token = c.form().value("logout_csrf");
    if !c.csrf_valid(&token, LOGOUT_ACTION)? {
        return Err(Failure::bad_request(CSRF_ERROR));
    }

    if let Some(user) = c.current_user() {
        tracing::info!(user_id = user.id, "User logged out");
    }
    c.sign_out()?;
    c.redirect("/", StatusCode::FOUND)
}

#[derive(Serialize)]
struct ProfileView {
    title: String,
    user: User,
    thread_count: i64,
    comment_count: i64,
}

/// `GET /user?id=`
pub async fn profile(c: &mut Container) -> Outcome {
    let user_id = query_id(c, "id")?;
    let user = c
        .users()
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| Failure::not_found(format!("User with ID {user_id} not found")))?;

    let thread_count = c.threads().count_by_author_id(user.id).await?;
    let comment_count = c.comments().count_by_author_id(user.id).await?;
    let view = ProfileView {
        title: user.username.clone(),
        user,
        thread_count,
        comment_count,
    };
    c.render("user_profile", &view)
}
