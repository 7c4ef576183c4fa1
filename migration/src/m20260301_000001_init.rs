use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ========== SYSTEMS ==========
        manager
            .create_table(
                Table::create()
                    .table(Systems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Systems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Systems::SystemId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Systems::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Systems::Capacity).double())
                    .col(ColumnDef::new(Systems::PanelCount).integer())
                    .col(ColumnDef::new(Systems::PanelWattage).double())
                    .col(ColumnDef::new(Systems::InverterModel).string_len(128))
                    .col(ColumnDef::new(Systems::Location).text())
                    .col(ColumnDef::new(Systems::Latitude).double())
                    .col(ColumnDef::new(Systems::Longitude).double())
                    .col(ColumnDef::new(Systems::Timezone).string_len(64))
                    .col(ColumnDef::new(Systems::LocationName).string_len(256))
                    .col(ColumnDef::new(Systems::TiltAngle).double())
                    .col(ColumnDef::new(Systems::Azimuth).double())
                    .col(
                        ColumnDef::new(Systems::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Systems::InstallationDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Systems::ExtraMetadata).json_binary())
                    .col(
                        ColumnDef::new(Systems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Systems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_systems_is_active")
                    .table(Systems::Table)
                    .col(Systems::IsActive)
                    .to_owned(),
            )
            .await?;

        // ========== MEASUREMENTS ==========
        // No FK to systems: devices may report before their installation is registered.
        manager
            .create_table(
                Table::create()
                    .table(Measurements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Measurements::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Measurements::SystemId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Measurements::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Measurements::Voltage).double())
                    .col(ColumnDef::new(Measurements::Current).double())
                    .col(ColumnDef::new(Measurements::Power).double())
                    .col(ColumnDef::new(Measurements::Irradiance).double())
                    .col(ColumnDef::new(Measurements::Temperature).double())
                    .col(ColumnDef::new(Measurements::AmbientTemperature).double())
                    .col(ColumnDef::new(Measurements::Energy).double())
                    .col(ColumnDef::new(Measurements::Efficiency).double())
                    .col(
                        ColumnDef::new(Measurements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_measurements_system_timestamp")
                    .table(Measurements::Table)
                    .col(Measurements::SystemId)
                    .col(Measurements::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_measurements_timestamp")
                    .table(Measurements::Table)
                    .col(Measurements::Timestamp)
                    .to_owned(),
            )
            .await?;

        // ========== WEATHER CURRENT ==========
        manager
            .create_table(
                Table::create()
                    .table(WeatherCurrent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WeatherCurrent::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WeatherCurrent::SystemId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WeatherCurrent::FetchedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WeatherCurrent::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(WeatherCurrent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_weather_current_system_fetched")
                    .table(WeatherCurrent::Table)
                    .col(WeatherCurrent::SystemId)
                    .col(WeatherCurrent::FetchedAt)
                    .to_owned(),
            )
            .await?;

        // ========== WEATHER FORECAST ==========
        manager
            .create_table(
                Table::create()
                    .table(WeatherForecast::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WeatherForecast::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WeatherForecast::SystemId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(WeatherForecast::Days).integer().not_null())
                    .col(
                        ColumnDef::new(WeatherForecast::FetchedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WeatherForecast::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(WeatherForecast::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_weather_forecast_system_days_fetched")
                    .table(WeatherForecast::Table)
                    .col(WeatherForecast::SystemId)
                    .col(WeatherForecast::Days)
                    .col(WeatherForecast::FetchedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(WeatherForecast::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(WeatherCurrent::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(Measurements::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Systems::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Systems {
    Table,
    Id,
    SystemId,
    Name,
    Capacity,
    PanelCount,
    PanelWattage,
    InverterModel,
    Location,
    Latitude,
    Longitude,
    Timezone,
    LocationName,
    TiltAngle,
    Azimuth,
    IsActive,
    InstallationDate,
    ExtraMetadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Measurements {
    Table,
    Id,
    SystemId,
    Timestamp,
    Voltage,
    Current,
    Power,
    Irradiance,
    Temperature,
    AmbientTemperature,
    Energy,
    Efficiency,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WeatherCurrent {
    Table,
    Id,
    SystemId,
    FetchedAt,
    Data,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WeatherForecast {
    Table,
    Id,
    SystemId,
    Days,
    FetchedAt,
    Data,
    CreatedAt,
}
