use super::render_page;
use crate::countdown::days_until_next_from_today;
use crate::forms::{BirthdayForm, CongratulationForm, FormErrors, UploadedImage, COMMENT_MAX_LEN};
use crate::media;
use crate::models::{Birthday, CongratulationRow, Tag};
use crate::storage::PageNumber;
use crate::web::{error::AppError, middleware::RequestContext, AppState};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/birthday/", get(list_birthdays))
        .route("/birthday/create/", get(create_form).post(create_birthday))
        .route("/birthday/:id/", get(birthday_detail))
        .route("/birthday/:id/edit/", get(edit_form).post(update_birthday))
        .route("/birthday/:id/delete/", get(delete_confirm).post(delete_birthday))
        .route("/birthday/:id/comment/", post(add_comment))
}

fn detail_url(id: u64) -> String {
    format!("/birthday/{id}/")
}

fn parse_id(raw: &str) -> Result<u64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

async fn load_birthday(state: &AppState, raw_id: &str) -> Result<Birthday, AppError> {
    let id = parse_id(raw_id)?;
    state.birthdays.get_birthday(id).await?.ok_or(AppError::NotFound)
}

fn ensure_can_edit(state: &AppState, ctx: &RequestContext, birthday: &Birthday) -> Result<(), AppError> {
    if state.config.edit_policy.allows(birthday.owner.as_deref(), ctx.user_id()) {
        Ok(())
    } else {
        info!(id = birthday.id, "edit denied by policy");
        Err(AppError::Forbidden)
    }
}

async fn discard_image(state: &AppState, image: Option<&str>) {
    if let Some(image) = image {
        media::remove_image(&state.config.media_dir, image).await;
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<String>,
}

async fn list_birthdays(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let page_number = PageNumber::parse(query.page.as_deref()).ok_or(AppError::NotFound)?;
    let mut page = state
        .birthdays
        .list_page(page_number, state.config.page_size)
        .await?
        .ok_or(AppError::NotFound)?;

    let owners = state
        .users
        .usernames(page.items.iter().filter_map(|row| row.birthday.owner.as_ref()))
        .await?;
    for row in &mut page.items {
        row.owner_name = row.birthday.owner.as_ref().and_then(|id| owners.get(id).cloned());
    }

    let mut context = ctx.template_context();
    context.insert("page", &page);
    render_page("birthday/list.html", &context)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailQuery {
    comment_error: Option<String>,
}

async fn birthday_detail(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Html<String>, AppError> {
    let birthday = load_birthday(&state, &id).await?;
    let congratulations = state.birthdays.congratulations_for(birthday.id).await?;

    // Owner and comment authors are resolved with one lookup.
    let names = state
        .users
        .usernames(birthday.owner.iter().chain(congratulations.iter().map(|c| &c.author)))
        .await?;
    let rows: Vec<CongratulationRow> = congratulations
        .into_iter()
        .map(|c| CongratulationRow {
            author_name: names.get(&c.author).cloned().unwrap_or_default(),
            congratulation: c,
        })
        .collect();

    let mut context = ctx.template_context();
    context.insert("full_name", &birthday.full_name());
    context.insert("tag_names", &state.birthdays.tag_names(&birthday.tags).await?);
    context.insert("owner_name", &birthday.owner.as_ref().and_then(|id| names.get(id)));
    context.insert("countdown", &days_until_next_from_today(birthday.birthday));
    context.insert("congratulations", &rows);
    context.insert("form", &serde_json::json!({ "text": "" }));
    context.insert("comment_error", &query.comment_error.is_some());
    context.insert("comment_max_len", &COMMENT_MAX_LEN);
    context.insert("can_edit", &state.config.edit_policy.allows(birthday.owner.as_deref(), ctx.user_id()));
    context.insert("birthday", &birthday);
    render_page("birthday/detail.html", &context)
}

#[derive(Debug, Serialize)]
struct TagOption {
    id: u64,
    name: String,
    selected: bool,
}

fn tag_options(tags: &[Tag], form: &BirthdayForm) -> Vec<TagOption> {
    tags.iter()
        .map(|t| TagOption {
            id: t.id,
            name: t.name.clone(),
            selected: form.tags.iter().any(|selected| selected == &t.id.to_string()),
        })
        .collect()
}

async fn render_birthday_form(
    state: &AppState,
    ctx: &RequestContext,
    form: &BirthdayForm,
    errors: &FormErrors,
    existing: Option<&Birthday>,
) -> Result<Response, AppError> {
    let tags = state.birthdays.get_all_tags().await?;
    let mut context = ctx.template_context();
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("tags", &tag_options(&tags, form));
    if let Some(birthday) = existing {
        context.insert("birthday_id", &birthday.id);
        context.insert("current_image", &birthday.image);
    }
    Ok(render_page("birthday/form.html", &context)?.into_response())
}

/// Reads the multipart birthday form and its CSRF token.
async fn read_birthday_form(mut multipart: Multipart) -> Result<(BirthdayForm, String), AppError> {
    let mut form = BirthdayForm::default();
    let mut csrf_token = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.image = Some(UploadedImage {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "csrf_token" => csrf_token = field.text().await?,
            "first_name" => form.first_name = field.text().await?,
            "last_name" => form.last_name = field.text().await?,
            "birthday" => form.birthday = field.text().await?,
            "tags" => form.tags.push(field.text().await?),
            _ => {}
        }
    }
    Ok((form, csrf_token))
}

async fn create_form(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, AppError> {
    render_birthday_form(&state, &ctx, &BirthdayForm::default(), &FormErrors::default(), None).await
}

async fn create_birthday(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (form, csrf_token) = read_birthday_form(multipart).await?;
    ctx.check_csrf(&csrf_token)?;

    let tags = state.birthdays.get_all_tags().await?;
    let mut draft = match form.validate(&tags, Local::now().date_naive()) {
        Ok(draft) => draft,
        Err(errors) => return render_birthday_form(&state, &ctx, &form, &errors, None).await,
    };
    if let Some(image) = &form.image {
        draft.image = Some(media::save_image(&state.config.media_dir, image).await?);
    }
    let new_image = draft.image.clone();

    let owner = ctx.user_id().map(str::to_string);
    let birthday = match state.birthdays.create_birthday(owner, draft).await {
        Ok(birthday) => birthday,
        Err(e) => {
            discard_image(&state, new_image.as_deref()).await;
            return Err(e.into());
        }
    };
    info!(id = birthday.id, "birthday created");
    Ok(Redirect::to(&detail_url(birthday.id)).into_response())
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let birthday = load_birthday(&state, &id).await?;
    ensure_can_edit(&state, &ctx, &birthday)?;
    let form = BirthdayForm::from_birthday(&birthday);
    render_birthday_form(&state, &ctx, &form, &FormErrors::default(), Some(&birthday)).await
}

async fn update_birthday(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (form, csrf_token) = read_birthday_form(multipart).await?;
    ctx.check_csrf(&csrf_token)?;
    let birthday = load_birthday(&state, &id).await?;
    ensure_can_edit(&state, &ctx, &birthday)?;

    let tags = state.birthdays.get_all_tags().await?;
    let mut draft = match form.validate(&tags, Local::now().date_naive()) {
        Ok(draft) => draft,
        Err(errors) => return render_birthday_form(&state, &ctx, &form, &errors, Some(&birthday)).await,
    };
    if let Some(image) = &form.image {
        draft.image = Some(media::save_image(&state.config.media_dir, image).await?);
    }
    let new_image = draft.image.clone();

    let updated = match state.birthdays.update_birthday(birthday.id, draft).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            discard_image(&state, new_image.as_deref()).await;
            return Err(AppError::NotFound);
        }
        Err(e) => {
            discard_image(&state, new_image.as_deref()).await;
            return Err(e.into());
        }
    };
    // A new upload replaces the previous file.
    if new_image.is_some() {
        discard_image(&state, birthday.image.as_deref()).await;
    }
    info!(id = updated.id, "birthday updated");
    Ok(Redirect::to(&detail_url(updated.id)).into_response())
}

async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let birthday = load_birthday(&state, &id).await?;
    ensure_can_edit(&state, &ctx, &birthday)?;

    let mut context = ctx.template_context();
    context.insert("full_name", &birthday.full_name());
    context.insert("birthday", &birthday);
    render_page("birthday/confirm_delete.html", &context)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsrfOnlyForm {
    csrf_token: String,
}

async fn delete_birthday(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Form(form): Form<CsrfOnlyForm>,
) -> Result<Redirect, AppError> {
    ctx.check_csrf(&form.csrf_token)?;
    let birthday = load_birthday(&state, &id).await?;
    ensure_can_edit(&state, &ctx, &birthday)?;

    let removed = state
        .birthdays
        .delete_birthday(birthday.id)
        .await?
        .ok_or(AppError::NotFound)?;
    discard_image(&state, removed.image.as_deref()).await;
    info!(id = birthday.id, "birthday deleted");
    Ok(Redirect::to("/birthday/"))
}

/// Stores a congratulation written by the current user. Invalid text is not
/// stored; the detail page is told to show an error instead.
async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Form(form): Form<CongratulationForm>,
) -> Result<Redirect, AppError> {
    ctx.check_csrf(&form.csrf_token)?;
    let birthday_id = parse_id(&id)?;
    let Some(viewer) = &ctx.viewer else {
        return Ok(Redirect::to(&format!("/auth/login/?next={}", detail_url(birthday_id))));
    };
    let birthday = state
        .birthdays
        .get_birthday(birthday_id)
        .await?
        .ok_or(AppError::NotFound)?;

    match form.validate() {
        Ok(text) => {
            let congratulation = state
                .birthdays
                .add_congratulation(birthday.id, viewer.id.clone(), text)
                .await?;
            info!(birthday = birthday.id, id = congratulation.id, "congratulation added");
            Ok(Redirect::to(&detail_url(birthday.id)))
        }
        Err(errors) => {
            debug!(birthday = birthday.id, ?errors, "congratulation rejected");
            Ok(Redirect::to(&format!("{}?comment_error=1", detail_url(birthday.id))))
        }
    }
}
