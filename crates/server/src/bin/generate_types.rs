use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn generate_types_content() -> String {
    let decls = [
        db::models::user::Role::decl(),
        db::models::user::User::decl(),
        db::models::user::UpdateProfile::decl(),
        db::models::product::Product::decl(),
        db::models::product::CreateProduct::decl(),
        db::models::product::UpdateProduct::decl(),
        db::models::product::ProductQuery::decl(),
        db::models::repair::RepairStatus::decl(),
        db::models::repair::DiagnosisSource::decl(),
        db::models::repair::StatusChange::decl(),
        db::models::repair::RepairJob::decl(),
        db::models::repair::RepairIntake::decl(),
        db::models::repair::UpdateRepairDetails::decl(),
        db::models::repair_chat::RepairChatMessage::decl(),
        db::models::repair_chat::CreateRepairChatMessage::decl(),
        db::models::order::OrderStatus::decl(),
        db::models::order::PaymentMethod::decl(),
        db::models::order::OrderItem::decl(),
        db::models::order::ShippingAddress::decl(),
        db::models::order::Order::decl(),
        db::models::chat_session::MessageSender::decl(),
        db::models::chat_session::SupportMode::decl(),
        db::models::chat_session::ChatMessage::decl(),
        db::models::chat_session::ChatSession::decl(),
        db::models::contact_message::ContactMessage::decl(),
        db::models::contact_message::CreateContactMessage::decl(),
        db::models::cms::HeroSection::decl(),
        db::models::cms::FeatureCard::decl(),
        db::models::cms::PromoBanner::decl(),
        db::models::cms::ContactDetails::decl(),
        db::models::cms::CmsContent::decl(),
        db::models::cms::CmsDocument::decl(),
        services::services::access::View::decl(),
        services::services::access::DashboardTab::decl(),
        services::services::ai_assistant::Diagnosis::decl(),
        services::services::checkout::CartLine::decl(),
        services::services::checkout::PlaceOrder::decl(),
        services::services::database_validator::ValidationResult::decl(),
        server::routes::health::HealthStatus::decl(),
        server::routes::users::UpdateRoleRequest::decl(),
        server::routes::repairs::AssignFixerRequest::decl(),
        server::routes::repairs::UpdateRepairStatusRequest::decl(),
        server::routes::orders::UpdateOrderStatusRequest::decl(),
        server::routes::support::SupportMessageRequest::decl(),
        server::routes::dashboard::Navigation::decl(),
        server::routes::dashboard::DashboardStats::decl(),
        server::routes::dashboard::Dashboard::decl(),
        utils::response::ApiResponse::<()>::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                trimmed.to_string()
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "// This file was generated by `generate_types`. Do not edit it by hand.\n\n{body}\n"
    )
}

fn main() -> anyhow::Result<()> {
    let check_mode = env::args().any(|arg| arg == "--check");
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let output = manifest_dir.join("../../shared/types.ts");
    let content = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&output).unwrap_or_default();
        if current == content {
            println!("shared/types.ts is up to date.");
            return Ok(());
        }
        anyhow::bail!("shared/types.ts is out of date, run `cargo run --bin generate_types`");
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, content)?;
    println!("Wrote {}", output.display());
    Ok(())
}
