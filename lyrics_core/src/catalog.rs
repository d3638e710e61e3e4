//! Static reference data: category tabs, rhythm catalog and archetypes.
//!
//! Everything here is read-only. Generation captures copies of the selected
//! records at launch time, so nothing in this module is ever mutated.

use serde::Serialize;

/// A category tab with its seed topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
    pub topics: &'static [&'static str],
}

impl Category {
    /// The rhythm library tab is a browser, not a generation target.
    pub fn is_generatable(&self) -> bool {
        self.key != LIBRARY_CATEGORY
    }

    /// Seed topic used when a session is first created.
    pub fn default_topic(&self) -> &'static str {
        self.topics.first().copied().unwrap_or(self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rhythm {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Archetype {
    pub name: String,
    pub motto: String,
    pub desire: String,
    pub fear: String,
}

pub const DEFAULT_CATEGORY: &str = "RAIZ_HIPHOP";
pub const LIBRARY_CATEGORY: &str = "RITMOS";

pub const CATEGORIES: &[Category] = &[
    Category {
        key: "RAIZ_HIPHOP",
        label: "RAIZ HIP HOP",
        topics: &["Raiz do Hip Hop: Fundamento", "Cultura de Rua Original", "MPC 60 Street"],
    },
    Category {
        key: "BOOMBAP",
        label: "BOOM BAP",
        topics: &["Pancadaria Boom Bap", "Batida Seca Raw", "Flow de MPC Clássico"],
    },
    Category {
        key: "RAP",
        label: "RAP",
        topics: &["Rap Nacional: Visão", "Poesia de Concreto", "Lírica de Sobrevivência"],
    },
    Category {
        key: "TRAP",
        label: "TRAP",
        topics: &["Trap Hype 333", "Lifestyle e Ouro", "Futuro do 808"],
    },
    Category {
        key: "DRILL",
        label: "DRILL",
        topics: &["Tensão Drill", "Guerra de Rima", "Slide Tático"],
    },
    Category {
        key: "GANGSTAR_RAP",
        label: "GANGSTAR RAP",
        topics: &["Gangstar Rap: Realidade", "Crônicas do Gueto", "Flow Criminoso"],
    },
    Category {
        key: "GANGSTAR_TRAP",
        label: "GANGSTAR TRAP",
        topics: &["Gangstar Trap: Poder", "Máfia Digital", "Ostentação Perigosa"],
    },
    Category {
        key: "GANGSTAR_BOOMBAP",
        label: "GANGSTAR BAP",
        topics: &["Gangstar Boom Bap: Pesado", "Classic Street Crime", "Peso do Asfalto"],
    },
    Category {
        key: "FRESTYLE",
        label: "FREESTYLE",
        topics: &["Improviso de Rua Afiado", "Batalha de MCs: Fogo Cruzado", "Flow Livre Sem Limites"],
    },
    Category {
        key: "REPENTE_DRIL",
        label: "REPENTE DRIL",
        topics: &["Repente com Grave de Drill", "Cordel Urbano Tático", "Tradição Nordestina e Tensão"],
    },
    Category {
        key: "NOTICIAS",
        label: "NOTÍCIAS DO DIA",
        topics: &["Street News: Rap + Trap + Boombap", "Visão Diária do Mundo", "Notícias do Asfalto"],
    },
    Category {
        key: "BRASIL",
        label: "MÚSICA BRASIL",
        topics: &["Música Brasil: Rua Séria", "Sinfonia Tropical de Elite", "Identidade Verde-Amarela"],
    },
    Category {
        key: "URBANOS",
        label: "URBANOS",
        topics: &[
            "Urban Beats: Jersey Club",
            "Grime London Streets",
            "Baile Mandelão Inovação",
            "Amapiano Urban Mix",
        ],
    },
    Category {
        key: "REGGAE",
        label: "REGGAE",
        topics: &[
            "Reggae Funk: O Grave e a Brisa",
            "Roots Street Style",
            "Dancehall de Favela",
            "Swing da Ilha Matrix",
        ],
    },
    Category {
        key: "RITMOS",
        label: "200 RITMOS",
        topics: &["Exploração de 200 Ritmos do Mundo"],
    },
];

const RHYTHMS: &[(&str, &str)] = &[
    ("Samba Pagode", "O balanço do surdo com a malandragem do cavaco e a energia do povo."),
    ("Gafieira Street", "Sincopado elegante com metais de rua e o grave do subúrbio."),
    ("Pagode 90", "Sentimentalismo rítmico com percussão orgânica e o balanço das massas."),
    ("Quantum-Drill X", "Grave que colapsa em frequências ultra-baixas com micro-percussão de plasma."),
    ("Neuro-Flow Boombap", "Balanço orgânico gerado por redes neurais, texturas líquidas e jazz futurista."),
    ("Cyber-Mandelão 4.0", "Impacto digital puro, estalo de fibra óptica e sub-bass abissal de 20Hz."),
    ("Glitch-Hop v12", "Texturas de erro rítmico proposital com swing pesado de concreto e neon."),
    ("Void-Trap", "Silêncios táticos e frequências de vácuo abissal entre os ataques de 808."),
    ("Hyper-Jersey Pulse", "155 BPM de energia cinética com kicks que desafiam a gravidade e a física."),
    ("Bio-Organic Rap", "Ritmo que pulsa na frequência cardíaca, integrando sons de ecossistemas processados."),
    ("Steam-Punk Boombap", "Engrenagens, pistões e vapor rítmico com bumbo de latão oxidado."),
    ("Amapiano Urban Mix", "Log drum sul-africano hipnótico com percussão de madeira quântica."),
    ("Sitar Indiano Trap", "Corda psicodélica com microtons ancestrais e grave 808 sintético."),
    ("Void-Drill", "Atmosfera de isolamento tático com percussão metálica fria."),
    ("Detroit 313 Kick", "Batida mecânica de alta precisão com kicks duplicados e agressivos."),
];

const ARCHETYPES: &[(&str, &str, &str, &str)] = &[
    (
        "GILBV - SÓ NA PRODUÇÃO",
        "PRODUÇÃO INFINITUS - RIMADORES SEM LIMITITE ALGORITMO - SEGUE O RITMO",
        "Hype Global",
        "Silêncio",
    ),
    ("GILBV - Algoritmo Zeus", "Métrica Divina - O topo da cadeia alimentar lírica", "Som Eterno", "Grave excessivo"),
    ("REGGAE FUNK", "Sinta a brisa do grave - Swing do morro com a calma da ilha", "Equilíbrio sonoro", "Falta de groove"),
    ("RIMADOR", "O verbo é a única ferramenta - Rima por esporte e sobrevivência", "Métrica perfeita", "Perder o fôlego"),
    ("NOVO RITMO URBANO", "A vanguarda das ruas - Jersey, Grime e Mandelão", "Inovação Sonora", "Ser ultrapassado"),
    ("Mestre do Boom Bap", "MPC é a lei sagrada", "Respeito das Ruas", "Beat sem swing"),
    ("Trap-Star 333", "Ouro, velocidade e 808", "Ostentação Suprema", "Ficar Offline"),
    ("Sniper do Drill", "Tensão tática em cada slide", "Domínio Urbano", "Traição"),
];

pub fn categories() -> &'static [Category] {
    CATEGORIES
}

pub fn category(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.key.eq_ignore_ascii_case(key))
}

pub fn rhythms() -> Vec<Rhythm> {
    RHYTHMS
        .iter()
        .map(|(name, description)| Rhythm {
            name: (*name).to_string(),
            description: (*description).to_string(),
        })
        .collect()
}

pub fn rhythm(name: &str) -> Option<Rhythm> {
    rhythms().into_iter().find(|r| r.name == name)
}

/// Case-insensitive match on name or description. An empty query keeps everything.
pub fn filter_rhythms(query: &str) -> Vec<Rhythm> {
    let needle = query.to_lowercase();
    rhythms()
        .into_iter()
        .filter(|r| {
            r.name.to_lowercase().contains(&needle) || r.description.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn archetypes() -> Vec<Archetype> {
    ARCHETYPES
        .iter()
        .map(|(name, motto, desire, fear)| Archetype {
            name: (*name).to_string(),
            motto: (*motto).to_string(),
            desire: (*desire).to_string(),
            fear: (*fear).to_string(),
        })
        .collect()
}

pub fn archetype(name: &str) -> Option<Archetype> {
    archetypes().into_iter().find(|a| a.name == name)
}

pub fn default_archetype() -> Archetype {
    let (name, motto, desire, fear) = ARCHETYPES[0];
    Archetype {
        name: name.to_string(),
        motto: motto.to_string(),
        desire: desire.to_string(),
        fear: fear.to_string(),
    }
}
