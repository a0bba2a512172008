//! Vocabulary definitions
//!
//! One invocation per enumerated field. Tags are the stored values; labels
//! are what the UI shows.

use super::EnumField;

vocabulary!(
    /// Project type; the discriminant of the unified record
    ProjectType as EnumField::ProjectType, {
        InternalPreparation => ("internal-preparation", "院内制剂"),
        InnovativeDrug => ("innovative-drug", "创新药"),
        MedicalDevice => ("medical-device", "医疗器械"),
        DigitalHealth => ("digital-health", "数字医疗"),
        Other => ("other", "其他项目"),
    }
);

impl ProjectType {
    /// Internal preparations are the only type keyed on formulation
    /// rather than on a dated follow-up plan
    pub const fn is_internal_preparation(&self) -> bool {
        matches!(self, ProjectType::InternalPreparation)
    }
}

vocabulary!(
    /// Owning department
    Department as EnumField::Department, {
        TransferInvestmentDept1 => ("transfer-investment-dept-1", "转化投资一部"),
        TransferInvestmentDept2 => ("transfer-investment-dept-2", "转化投资二部"),
        TransferInvestmentDept3 => ("transfer-investment-dept-3", "转化投资三部"),
    }
);

impl Default for Department {
    fn default() -> Self {
        Department::TransferInvestmentDept1
    }
}

vocabulary!(
    /// Where the project originated
    ProjectSource as EnumField::Source, {
        Hospital => ("hospital", "院内"),
        University => ("university", "高校"),
        Enterprise => ("enterprise", "企业"),
        Other => ("other", "其他"),
    }
);

impl Default for ProjectSource {
    fn default() -> Self {
        ProjectSource::Hospital
    }
}

vocabulary!(
    /// Business importance
    Importance as EnumField::Importance, {
        VeryImportant => ("very-important", "非常重要"),
        Important => ("important", "重要"),
        Normal => ("normal", "一般"),
    }
);

vocabulary!(
    /// Development stage of the project
    ProjectStatus as EnumField::Status, {
        EarlyStage => ("early-stage", "早期"),
        Preclinical => ("preclinical", "临床前"),
        ClinicalStage => ("clinical-stage", "临床阶段"),
        MarketProduct => ("market-product", "上市产品"),
    }
);

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::EarlyStage
    }
}

vocabulary!(
    /// Requested form of technology transfer
    TransformRequirement as EnumField::TransformRequirement, {
        ToBeDetermined => ("to-be-determined", "待定"),
        Licensing => ("licensing", "许可"),
        Assignment => ("assignment", "转让"),
        JointDevelopment => ("joint-development", "合作开发"),
        EquityInvestment => ("equity-investment", "作价入股"),
    }
);

vocabulary!(
    /// Progress of the technology transfer
    TransformProgress as EnumField::TransformProgress, {
        NotStarted => ("not-started", "未开始"),
        Negotiating => ("negotiating", "洽谈中"),
        ContractSigned => ("contract-signed", "已签约"),
        Completed => ("completed", "已完成"),
    }
);

vocabulary!(
    /// Responsible project leader
    Leader as EnumField::Leader, {
        WangLiyan => ("wang-liyan", "王立言"),
        ZhangMin => ("zhang-min", "张敏"),
        LiHua => ("li-hua", "李华"),
        ChenJing => ("chen-jing", "陈静"),
    }
);

vocabulary!(
    /// Status of the externally generated AI report
    ///
    /// Transitions (`idle -> generating -> completed | error -> generating`)
    /// belong to the report generator; the record only stores the tag.
    AiReportStatus as EnumField::AiReportStatus, {
        Idle => ("idle", "未生成"),
        Generating => ("generating", "生成中"),
        Completed => ("completed", "已完成"),
        Error => ("error", "生成失败"),
    }
);

impl Default for AiReportStatus {
    fn default() -> Self {
        AiReportStatus::Idle
    }
}
