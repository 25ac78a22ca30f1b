use serde::{Deserialize, Serialize};

use crate::validation::ProfileForm;

pub const STATUS_RESERVED: &str = "reserved";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_RESCHEDULED: &str = "rescheduled";

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub language: String,
    pub profile_data: String,
    pub calendar: String,
    pub created_at: String,
    pub updated_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct PatientRow {
    pub id: String,
    pub doctor_id: String,
    pub patient_nom: Option<String>,
    pub patient_telephone: Option<String>,
    pub patient_email: Option<String>,
    pub patient_date_reservation: Option<String>,
    pub patient_time_reservation: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Reserved,
    Confirmed,
    Rescheduled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => STATUS_RESERVED,
            Self::Confirmed => STATUS_CONFIRMED,
            Self::Rescheduled => STATUS_RESCHEDULED,
        }
    }

    /// Unknown values fall back to `Reserved`, the state every reservation starts in.
    pub fn from_db(value: &str) -> Self {
        match value {
            STATUS_CONFIRMED => Self::Confirmed,
            STATUS_RESCHEDULED => Self::Rescheduled,
            _ => Self::Reserved,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayLanguage {
    Fr,
    Ar,
    #[default]
    Both,
}

impl DisplayLanguage {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fr" => Some(Self::Fr),
            "ar" => Some(Self::Ar),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::Ar => "ar",
            Self::Both => "both",
        }
    }

    pub fn shows_fr(self) -> bool {
        matches!(self, Self::Fr | Self::Both)
    }

    pub fn shows_ar(self) -> bool {
        matches!(self, Self::Ar | Self::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Fr,
    Ar,
}

impl Side {
    pub fn language_name(self) -> &'static str {
        match self {
            Self::Fr => "français",
            Self::Ar => "arabe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Nom,
    Prenom,
    Specialite,
    Ville,
    Quartier,
    Adresse,
    TypeDiplome,
    Secteur,
    Activite,
}

pub const ATTRIBUTES: [Attribute; 9] = [
    Attribute::Nom,
    Attribute::Prenom,
    Attribute::Specialite,
    Attribute::Ville,
    Attribute::Quartier,
    Attribute::Adresse,
    Attribute::TypeDiplome,
    Attribute::Secteur,
    Attribute::Activite,
];

pub const FIELD_TEL: &str = "tel";
pub const FIELD_EMAIL: &str = "email";

impl Attribute {
    pub fn key(self) -> &'static str {
        match self {
            Self::Nom => "nom",
            Self::Prenom => "prenom",
            Self::Specialite => "specialite",
            Self::Ville => "ville",
            Self::Quartier => "quartier",
            Self::Adresse => "adresse",
            Self::TypeDiplome => "type_diplome",
            Self::Secteur => "secteur",
            Self::Activite => "activite",
        }
    }

    pub fn form_key(self, side: Side) -> &'static str {
        match (self, side) {
            (Self::Nom, Side::Fr) => "nom_fr",
            (Self::Nom, Side::Ar) => "nom_ar",
            (Self::Prenom, Side::Fr) => "prenom_fr",
            (Self::Prenom, Side::Ar) => "prenom_ar",
            (Self::Specialite, Side::Fr) => "specialite_fr",
            (Self::Specialite, Side::Ar) => "specialite_ar",
            (Self::Ville, Side::Fr) => "ville_fr",
            (Self::Ville, Side::Ar) => "ville_ar",
            (Self::Quartier, Side::Fr) => "quartier_fr",
            (Self::Quartier, Side::Ar) => "quartier_ar",
            (Self::Adresse, Side::Fr) => "adresse_fr",
            (Self::Adresse, Side::Ar) => "adresse_ar",
            (Self::TypeDiplome, Side::Fr) => "type_diplome_fr",
            (Self::TypeDiplome, Side::Ar) => "type_diplome_ar",
            (Self::Secteur, Side::Fr) => "secteur_fr",
            (Self::Secteur, Side::Ar) => "secteur_ar",
            (Self::Activite, Side::Fr) => "activite_fr",
            (Self::Activite, Side::Ar) => "activite_ar",
        }
    }

    pub fn label(self, side: Side) -> &'static str {
        match (self, side) {
            (Self::Nom, Side::Fr) => "Nom",
            (Self::Nom, Side::Ar) => "الاسم",
            (Self::Prenom, Side::Fr) => "Prénom",
            (Self::Prenom, Side::Ar) => "الاسم الأول",
            (Self::Specialite, Side::Fr) => "Spécialité",
            (Self::Specialite, Side::Ar) => "التخصص",
            (Self::Ville, Side::Fr) => "Ville",
            (Self::Ville, Side::Ar) => "المدينة",
            (Self::Quartier, Side::Fr) => "Quartier",
            (Self::Quartier, Side::Ar) => "الحي",
            (Self::Adresse, Side::Fr) => "Adresse",
            (Self::Adresse, Side::Ar) => "العنوان",
            (Self::TypeDiplome, Side::Fr) => "Type de diplôme",
            (Self::TypeDiplome, Side::Ar) => "نوع الشهادة",
            (Self::Secteur, Side::Fr) => "Secteur",
            (Self::Secteur, Side::Ar) => "القطاع",
            (Self::Activite, Side::Fr) => "Activité",
            (Self::Activite, Side::Ar) => "النشاط",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bilingual {
    #[serde(default)]
    pub fr: String,
    #[serde(default)]
    pub ar: String,
}

impl Bilingual {
    pub fn get(&self, side: Side) -> &str {
        match side {
            Side::Fr => &self.fr,
            Side::Ar => &self.ar,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    pub nom: Bilingual,
    pub prenom: Bilingual,
    pub specialite: Bilingual,
    pub ville: Bilingual,
    pub quartier: Bilingual,
    pub adresse: Bilingual,
    pub type_diplome: Bilingual,
    pub secteur: Bilingual,
    pub activite: Bilingual,
    pub tel: String,
    pub email: String,
}

impl ProfileRecord {
    pub fn attribute(&self, attribute: Attribute) -> &Bilingual {
        match attribute {
            Attribute::Nom => &self.nom,
            Attribute::Prenom => &self.prenom,
            Attribute::Specialite => &self.specialite,
            Attribute::Ville => &self.ville,
            Attribute::Quartier => &self.quartier,
            Attribute::Adresse => &self.adresse,
            Attribute::TypeDiplome => &self.type_diplome,
            Attribute::Secteur => &self.secteur,
            Attribute::Activite => &self.activite,
        }
    }

    fn attribute_mut(&mut self, attribute: Attribute) -> &mut Bilingual {
        match attribute {
            Attribute::Nom => &mut self.nom,
            Attribute::Prenom => &mut self.prenom,
            Attribute::Specialite => &mut self.specialite,
            Attribute::Ville => &mut self.ville,
            Attribute::Quartier => &mut self.quartier,
            Attribute::Adresse => &mut self.adresse,
            Attribute::TypeDiplome => &mut self.type_diplome,
            Attribute::Secteur => &mut self.secteur,
            Attribute::Activite => &mut self.activite,
        }
    }

    pub fn from_form(form: &ProfileForm) -> Self {
        let mut record = Self::default();
        for attribute in ATTRIBUTES {
            let value = record.attribute_mut(attribute);
            value.fr = form.get(attribute.form_key(Side::Fr)).to_string();
            value.ar = form.get(attribute.form_key(Side::Ar)).to_string();
        }
        record.tel = form.get(FIELD_TEL).to_string();
        record.email = form.get(FIELD_EMAIL).to_string();
        record
    }

    pub fn to_form(&self) -> ProfileForm {
        let mut form = ProfileForm::default();
        for attribute in ATTRIBUTES {
            let value = self.attribute(attribute);
            form.set(attribute.form_key(Side::Fr), &value.fr);
            form.set(attribute.form_key(Side::Ar), &value.ar);
        }
        form.set(FIELD_TEL, &self.tel);
        form.set(FIELD_EMAIL, &self.email);
        form
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn display_name(&self, side: Side) -> String {
        let other = match side {
            Side::Fr => Side::Ar,
            Side::Ar => Side::Fr,
        };
        let pick = |side| {
            format!("{} {}", self.prenom.get(side), self.nom.get(side))
                .trim()
                .to_string()
        };
        let name = pick(side);
        if name.is_empty() {
            pick(other)
        } else {
            name
        }
    }
}
