#[cfg(test)]
mod integration_tests {
    use crate::flash::Level;
    use crate::schemas::{ApiResponse, ErrorResponse, NszuSavedResponse, RecordSavedResponse};
    use crate::test_utils::test_utils::{
        init_test_tracing, last_flash, location, login, server_as, setup_test_app, test_server,
    };
    use axum::http::StatusCode;
    use common::{MonthPeriod, kyiv_today};
    use model::entities::{audit_log, department, user};
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

    fn today() -> String {
        kyiv_today().format("%d.%m.%Y").to_string()
    }

    fn record_form<'a>(date: &'a str, full_name: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("date_of_discharge", date),
            ("full_name", full_name),
            ("discharge_department", "Терапевтичне"),
            ("treating_physician", "Коваль О.М."),
            ("history", "123/45"),
            ("k_days", "7"),
        ]
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = test_server(setup_test_app().await);

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_pages_require_login() {
        let server = test_server(setup_test_app().await);

        for path in ["/", "/nszu", "/admin/users", "/records/add"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/login", "path {}", path);
        }
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let server = test_server(setup_test_app().await);

        let response = server
            .post("/login")
            .form(&[("username", "editor"), ("password", "wrong-password")])
            .await;
        assert_eq!(location(&response), "/login");
        let message = last_flash(&response);
        assert_eq!(message.level, Level::Danger);
        assert_eq!(message.message, "Невірне ім'я користувача або пароль");

        let response = login(&server, "editor").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let page = server.get("/").await;
        page.assert_status(StatusCode::OK);
        assert!(page.text().contains("editor"));

        // signed-in users skip the login page
        assert_eq!(location(&server.get("/login").await), "/");

        let response = server.get("/logout").await;
        assert_eq!(location(&response), "/login");
        assert_eq!(location(&server.get("/").await), "/login");
    }

    #[tokio::test]
    async fn test_operator_cannot_edit_records() {
        let (server, _) = server_as("operator").await;
        let response = server.post("/records/add").form(&record_form(&today(), "Іваненко Іван")).await;
        assert_eq!(location(&response), "/#record-1");

        let response = server.get("/records/1/edit").await;
        assert_eq!(location(&response), "/");
        assert_eq!(last_flash(&response).message, "Доступ заборонено");

        let response = server.get("/nszu").await;
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_viewer_lands_on_statistics() {
        let (server, _) = server_as("viewer").await;

        let response = server.get("/").await;
        assert_eq!(location(&response), "/admin/statistics");

        server.get("/admin/statistics").await.assert_status(StatusCode::OK);

        let month = MonthPeriod::current().to_string();
        server
            .get(&format!("/?month_filter={}", month))
            .await
            .assert_status(StatusCode::OK);

        // statistics only; user management stays admin-only
        assert_eq!(location(&server.get("/admin/users").await), "/");
    }

    #[tokio::test]
    async fn test_add_record_validates_and_audits() {
        let (server, state) = server_as("operator").await;

        let today = today();
        let mut form = record_form(&today, "Іваненко Іван");
        form.retain(|(field, _)| *field != "k_days");
        let response = server.post("/records/add").form(&form).await;
        assert_eq!(location(&response), "/records/add");
        assert_eq!(
            last_flash(&response).message,
            "Будь ласка, заповніть усі обов'язкові поля (виключаючи відділення)"
        );

        let response = server.post("/records/add").form(&record_form("31/12/2024", "Іваненко Іван")).await;
        assert_eq!(
            last_flash(&response).message,
            "Дата виписки повинна бути у форматі ДД.ММ.РРРР або РРРР-ММ-ДД"
        );

        let response = server.post("/records/add").form(&record_form(&today, "Іваненко Іван")).await;
        assert_eq!(location(&response), "/#record-1");
        assert_eq!(last_flash(&response).level, Level::Success);

        let page = server.get("/").await.text();
        assert!(page.contains("Іваненко Іван"));
        assert!(page.contains("Опрацьовується"));

        let entries = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq("record.create"))
            .all(&state.db)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type.as_deref(), Some("record"));
        assert!(entries[0].user_id.is_some());
    }

    #[tokio::test]
    async fn test_dashboard_counts_follow_month_filter() {
        let (server, _) = server_as("admin").await;
        let today = today();
        for (date, name) in [(today.as_str(), "Поточний Пацієнт"), ("15.01.2020", "Давній Пацієнт")] {
            let response = server.post("/records/add").form(&record_form(date, name)).await;
            assert!(location(&response).starts_with("/#record-"));
        }

        // also shows and clears the queued "added" flashes
        let page = server.get("/?all_months=1").await.text();
        assert!(page.contains("id=\"count-total\">2<"));
        assert!(page.contains("Давній Пацієнт"));

        let month = MonthPeriod::current().to_string();
        let page = server.get(&format!("/?month_filter={}", month)).await.text();
        assert!(page.contains("id=\"count-total\">1<"));
        assert!(page.contains("id=\"count-processing\">1<"));
        assert!(page.contains("Поточний Пацієнт"));
        assert!(!page.contains("Давній Пацієнт"));
    }

    #[tokio::test]
    async fn test_api_add_record() {
        let (server, _) = server_as("operator").await;

        let response = server.post("/api/records/add").form(&record_form(&today(), "Петренко Петро")).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<RecordSavedResponse> = response.json();
        assert!(body.success);
        assert_eq!(body.data.full_name, "Петренко Петро");

        let response = server
            .post("/api/records/add")
            .form(&record_form("not-a-date", "Петренко Петро"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(body.error, "Невірний формат дати виписки");
    }

    #[tokio::test]
    async fn test_nszu_add_with_decimal_comma() {
        let (server, state) = server_as("editor").await;
        let today = today();

        let response = server
            .post("/nszu/add")
            .form(&[
                ("date", today.as_str()),
                ("nszu_record_id", "A-100"),
                ("doctor", "Шевченко Т.Г."),
                ("status", "Оплачено"),
                ("fakt_summ", "1234,5"),
            ])
            .await;
        assert_eq!(location(&response), "/nszu");
        assert_eq!(last_flash(&response).level, Level::Success);

        let response = server
            .post("/nszu/api/add")
            .form(&[
                ("date", today.as_str()),
                ("nszu_record_id", "A-101"),
                ("doctor", "Шевченко Т.Г."),
                ("fakt_summ", "100"),
            ])
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<NszuSavedResponse> = response.json();
        assert_eq!(body.data.nszu_record_id, "A-101");

        let page = server.get("/nszu").await.text();
        assert!(page.contains("id=\"nszu-total-count\">2<"));
        assert!(page.contains("id=\"nszu-total-sum\">1334.50<"));

        let response = server
            .post("/nszu/add")
            .form(&[("date", today.as_str()), ("nszu_record_id", "A-102")])
            .await;
        assert_eq!(location(&response), "/nszu/add");
        assert_eq!(
            last_flash(&response).message,
            "Будь ласка, заповніть усі обов'язкові поля (дата, НСЗУ ID, лікар)"
        );

        let created = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq("nszu.create"))
            .count(&state.db)
            .await
            .unwrap();
        assert_eq!(created, 2);
    }

    #[tokio::test]
    async fn test_record_export_download() {
        let (server, state) = server_as("operator").await;
        let response = server.post("/records/add").form(&record_form(&today(), "Іваненко Іван")).await;
        assert_eq!(location(&response), "/#record-1");
        login(&server, "editor").await;

        let month = MonthPeriod::current();
        let response = server
            .post("/export")
            .form(&[("month_filter", month.to_string())])
            .await;
        response.assert_status(StatusCode::OK);
        let disposition = response.header("content-disposition");
        assert!(
            disposition
                .to_str()
                .unwrap()
                .contains(&format!("vipiski_export_{}.xlsx", month.file_label()))
        );
        // xlsx is a zip archive
        assert!(response.as_bytes().starts_with(b"PK"));

        let exported = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq("records.export"))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert!(exported.details.unwrap().ends_with("count=1"));
    }

    #[tokio::test]
    async fn test_empty_export_redirects_with_flash() {
        let (server, _) = server_as("editor").await;

        let response = server.post("/export").form(&[("month_filter", "2019-01")]).await;
        assert_eq!(location(&response), "/");
        assert_eq!(last_flash(&response).message, "Записів не знайдено для експорту");

        let response = server
            .post("/nszu/export")
            .form(&[("from_date", "2019-01-31"), ("to_date", "2019-01-01")])
            .await;
        assert_eq!(location(&response), "/nszu");
        assert_eq!(
            last_flash(&response).message,
            "Дата \"з\" не може бути пізніше дати \"по\""
        );
    }

    #[tokio::test]
    async fn test_operator_cannot_export() {
        let (server, _) = server_as("operator").await;
        let response = server.post("/export").form(&[("month_filter", "2024-05")]).await;
        assert_eq!(location(&response), "/");
        assert_eq!(last_flash(&response).message, "Доступ заборонено");
    }

    #[tokio::test]
    async fn test_admin_user_management() {
        let (server, state) = server_as("admin").await;

        let response = server
            .post("/admin/users/add")
            .form(&[("username", "editor"), ("password", "another1"), ("role", "editor")])
            .await;
        assert_eq!(location(&response), "/admin/users/add");
        assert_eq!(last_flash(&response).message, "Користувач \"editor\" вже існує");

        let response = server
            .post("/admin/users/add")
            .form(&[("username", "nurse"), ("password", "123"), ("role", "operator")])
            .await;
        assert_eq!(
            last_flash(&response).message,
            "Пароль повинен містити щонайменше 6 символів"
        );

        let response = server
            .post("/admin/users/add")
            .form(&[("username", "nurse"), ("password", "nurse-pass"), ("role", "operator")])
            .await;
        assert_eq!(location(&response), "/admin/users");
        assert!(server.get("/admin/users").await.text().contains("nurse"));

        let admin = user::Entity::find()
            .filter(user::Column::Username.eq("admin"))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        let response = server
            .post(&format!("/admin/users/{}/delete", admin.id))
            .await;
        assert_eq!(location(&response), "/admin/users");
        assert_eq!(
            last_flash(&response).message,
            "Ви не можете видалити власний обліковий запис"
        );

        let nurse = user::Entity::find()
            .filter(user::Column::Username.eq("nurse"))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        server.post(&format!("/admin/users/{}/delete", nurse.id)).await;
        assert!(user::Entity::find_by_id(nurse.id).one(&state.db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleted_user_loses_session() {
        let _tracing = init_test_tracing();
        let state = crate::test_utils::test_utils::setup_test_app_state().await;
        let app = crate::router::create_router(state.clone());
        let admin = test_server(app.clone());
        let editor = test_server(app);
        login(&admin, "admin").await;
        login(&editor, "editor").await;
        editor.get("/nszu").await.assert_status(StatusCode::OK);

        let editor_id = user::Entity::find()
            .filter(user::Column::Username.eq("editor"))
            .one(&state.db)
            .await
            .unwrap()
            .unwrap()
            .id;
        admin.post(&format!("/admin/users/{}/delete", editor_id)).await;

        assert_eq!(location(&editor.get("/nszu").await), "/login");
    }

    #[tokio::test]
    async fn test_departments_are_unique() {
        let (server, state) = server_as("admin").await;

        let response = server.post("/admin/departments").form(&[("name", "Хірургічне")]).await;
        assert_eq!(location(&response), "/admin/departments");
        assert_eq!(last_flash(&response).level, Level::Success);

        let response = server.post("/admin/departments").form(&[("name", " Хірургічне ")]).await;
        assert_eq!(
            last_flash(&response).message,
            "Відділення \"Хірургічне\" вже існує"
        );

        let response = server.post("/admin/departments").form(&[("name", "  ")]).await;
        assert_eq!(last_flash(&response).message, "Вкажіть назву відділення");

        assert_eq!(department::Entity::find().count(&state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let (server, _) = server_as("operator").await;

        let response = server
            .post("/change-password")
            .form(&[
                ("current_password", "secret123"),
                ("new_password", "brand-new"),
                ("confirm_password", "other"),
            ])
            .await;
        assert_eq!(location(&response), "/change-password");
        assert_eq!(last_flash(&response).message, "Нові паролі не збігаються");

        let response = server
            .post("/change-password")
            .form(&[
                ("current_password", "secret123"),
                ("new_password", "brand-new"),
                ("confirm_password", "brand-new"),
            ])
            .await;
        assert_eq!(location(&response), "/");
        assert_eq!(last_flash(&response).message, "Пароль успішно змінено");
    }

    #[tokio::test]
    async fn test_record_changes_return_to_filtered_dashboard() {
        let (server, _) = server_as("admin").await;
        let today = today();
        let full_name_query = "full_name=%D0%86%D0%B2%D0%B0%D0%BD%D0%B5%D0%BD%D0%BA%D0%BE";

        let mut form = record_form(&today, "Іваненко Іван");
        form.extend([("filter_all_months", "1"), ("filter_full_name", "Іваненко")]);
        let response = server.post("/records/add").form(&form).await;
        assert_eq!(
            location(&response),
            format!("/?all_months=1&{}#record-1", full_name_query)
        );

        let page = server.get(&format!("/?all_months=1&{}", full_name_query)).await.text();
        assert!(page.contains("id=\"record-1\""));
        assert!(page.contains("name=\"filter_all_months\" value=\"1\""));
        assert!(page.contains("/records/1/edit?filter_month_filter="));

        let page = server
            .get(&format!("/records/1/edit?filter_all_months=1&filter_{}", full_name_query))
            .await
            .text();
        assert!(page.contains("name=\"filter_full_name\" value=\"Іваненко\""));
        assert!(page.contains("<datalist id=\"physicians\">"));
        assert!(page.contains("<option value=\"Коваль О.М.\">"));

        let mut form = record_form(&today, "Іваненко Іван");
        form.extend([
            ("discharge_status", "Виписаний"),
            ("filter_all_months", "1"),
            ("filter_full_name", "Іваненко"),
        ]);
        let response = server.post("/records/1/edit").form(&form).await;
        assert_eq!(last_flash(&response).level, Level::Success);
        assert_eq!(
            location(&response),
            format!("/?all_months=1&{}#record-1", full_name_query)
        );

        form.retain(|(field, _)| *field != "k_days");
        let response = server.post("/records/1/edit").form(&form).await;
        assert_eq!(
            location(&response),
            format!("/records/1/edit?filter_all_months=1&filter_{}", full_name_query)
        );

        let response = server
            .post("/records/1/delete")
            .form(&[("filter_all_months", "1"), ("filter_discharge_status", "Виписаний")])
            .await;
        assert_eq!(last_flash(&response).level, Level::Danger);
        assert_eq!(
            location(&response),
            "/?all_months=1&discharge_status=%D0%92%D0%B8%D0%BF%D0%B8%D1%81%D0%B0%D0%BD%D0%B8%D0%B9"
        );
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let (server, _) = server_as("admin").await;
        let response = server.post("/records/add").form(&record_form(&today(), "Іваненко Іван")).await;
        assert_eq!(location(&response), "/#record-1");

        let huge = "page=18446744073709551615";
        let response = server.get(&format!("/?all_months=1&{}", huge)).await;
        response.assert_status(StatusCode::OK);
        let page = response.text();
        assert!(page.contains("Записів не знайдено"));
        assert!(page.contains("id=\"count-total\">1<"));

        server.get(&format!("/nszu?{}", huge)).await.assert_status(StatusCode::OK);
        server.get(&format!("/admin/audit?{}", huge)).await.assert_status(StatusCode::OK);
    }

    async fn seed_corrections(server: &axum_test::TestServer) {
        let today = today();
        for (id, status, amount) in [("A-200", "Оплачено", "1500,25"), ("A-201", "В обробці", "300")] {
            let response = server
                .post("/nszu/add")
                .form(&[
                    ("date", today.as_str()),
                    ("nszu_record_id", id),
                    ("doctor", "Шевченко Т.Г."),
                    ("status", status),
                    ("fakt_summ", amount),
                ])
                .await;
            assert_eq!(location(&response), "/nszu");
        }
    }

    fn month_so_far() -> [(&'static str, String); 2] {
        let today = kyiv_today();
        [
            ("from_date", MonthPeriod::current().range().from.format("%Y-%m-%d").to_string()),
            ("to_date", today.format("%Y-%m-%d").to_string()),
        ]
    }

    #[tokio::test]
    async fn test_nszu_export_download() {
        let (server, state) = server_as("editor").await;
        seed_corrections(&server).await;

        let response = server.post("/nszu/export").form(&month_so_far()).await;
        response.assert_status(StatusCode::OK);
        let disposition = response.header("content-disposition");
        let disposition = disposition.to_str().unwrap();
        assert!(disposition.contains("nszu_"));
        assert!(disposition.contains(".xlsx"));
        assert!(response.as_bytes().starts_with(b"PK"));

        let mut form = month_so_far().to_vec();
        form.push(("status", "Оплачено".to_string()));
        let response = server.post("/nszu/export").form(&form).await;
        response.assert_status(StatusCode::OK);

        let exports = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq("nszu.export"))
            .order_by_asc(audit_log::Column::Id)
            .all(&state.db)
            .await
            .unwrap();
        assert_eq!(exports.len(), 2);
        assert!(exports[0].details.as_deref().unwrap().ends_with("count=2"));
        assert!(exports[1].details.as_deref().unwrap().ends_with("count=1"));

        let response = server
            .post("/nszu/export")
            .form(&[("from_date", "2019-01-01"), ("to_date", "2019-01-31")])
            .await;
        assert_eq!(location(&response), "/nszu");
        assert_eq!(
            last_flash(&response).message,
            "Записів не знайдено для обраного діапазону дат"
        );
    }

    #[tokio::test]
    async fn test_nszu_print() {
        let (server, state) = server_as("editor").await;
        seed_corrections(&server).await;

        let response = server.post("/nszu/print").form(&[("from_date", "2024-01-01")]).await;
        assert_eq!(location(&response), "/nszu");
        assert_eq!(
            last_flash(&response).message,
            "Будь ласка, вкажіть обидві дати для друку"
        );

        let response = server.post("/nszu/print").form(&month_so_far()).await;
        let printed = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq("nszu.print"))
            .all(&state.db)
            .await
            .unwrap();
        if response.status_code() == StatusCode::OK {
            assert_eq!(response.header("content-type").to_str().unwrap(), "application/pdf");
            assert!(response.as_bytes().starts_with(b"%PDF"));
            assert_eq!(printed.len(), 1);
            assert!(printed[0].details.as_deref().unwrap().ends_with("count=2"));
        } else {
            // no PDF fonts installed on this machine
            assert_eq!(location(&response), "/nszu");
            assert_eq!(last_flash(&response).message, "Помилка при генерації PDF");
            assert!(printed.is_empty());
        }
    }
}
